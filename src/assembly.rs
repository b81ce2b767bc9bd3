// Reassembles concatenated SMS fragments, persisting partial sets
// One directory per (address, reference, count), one file per sequence

use crate::codec::Sms;
use crate::datatypes::Address;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AssemblyKey {
    addr: Address,
    reference: u16,
}

#[derive(Debug)]
struct AssemblyNode {
    max_fragments: u8,
    num_fragments: u8,
    /// Arrival of the first fragment; drives expiry
    ts: SystemTime,
    bitmap: [u8; 32],
    fragments: Vec<Sms>,
}

impl AssemblyNode {
    fn new(max_fragments: u8, ts: SystemTime) -> AssemblyNode {
        AssemblyNode {
            max_fragments,
            num_fragments: 0,
            ts,
            bitmap: [0u8; 32],
            fragments: Vec::new(),
        }
    }

    fn is_set(&self, seq: u8) -> bool {
        self.bitmap[usize::from(seq) / 8] & (1 << (seq % 8)) != 0
    }

    fn set(&mut self, seq: u8) {
        self.bitmap[usize::from(seq) / 8] |= 1 << (seq % 8);
    }

    /// Set bits below `seq`, which is the insertion index that keeps the
    /// fragment list in sequence order without sorting.
    fn position(&self, seq: u8) -> usize {
        (0..seq).filter(|&s| self.is_set(s)).count()
    }
}

/// Table of partially assembled concatenated messages. With a backing
/// directory, accepted fragments are written through before being counted
/// and reloaded on construction; write failures degrade to memory-only
/// tracking.
pub struct SmsAssembly {
    dir: Option<PathBuf>,
    nodes: HashMap<AssemblyKey, AssemblyNode>,
}

impl SmsAssembly {
    pub fn new(dir: Option<PathBuf>) -> SmsAssembly {
        let mut assembly = SmsAssembly {
            dir,
            nodes: HashMap::new(),
        };

        if let Some(dir) = assembly.dir.clone() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "cannot create assembly dir");
                assembly.dir = None;
            } else {
                assembly.reload(&dir);
            }
        }

        assembly
    }

    /// Offers one fragment. Returns the complete, sequence-ordered fragment
    /// list once the last missing piece arrives; `None` otherwise. Fragments
    /// that disagree with an existing node's declared count, or repeat a
    /// sequence number, are dropped.
    pub fn add_fragment(
        &mut self,
        sms: &Sms,
        ts: SystemTime,
        addr: &Address,
        reference: u16,
        max_fragments: u8,
        seq: u8,
    ) -> Option<Vec<Sms>> {
        self.insert_fragment(sms, ts, addr, reference, max_fragments, seq, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_fragment(
        &mut self,
        sms: &Sms,
        ts: SystemTime,
        addr: &Address,
        reference: u16,
        max_fragments: u8,
        seq: u8,
        persist: bool,
    ) -> Option<Vec<Sms>> {
        let key = AssemblyKey {
            addr: addr.clone(),
            reference,
        };

        let complete = {
            let node = match self.nodes.entry(key.clone()) {
                Entry::Occupied(entry) => {
                    if entry.get().max_fragments != max_fragments {
                        return None;
                    }
                    entry.into_mut()
                }
                Entry::Vacant(entry) => entry.insert(AssemblyNode::new(max_fragments, ts)),
            };

            if node.is_set(seq) {
                return None;
            }

            let position = node.position(seq);
            node.fragments.insert(position, sms.clone());
            node.set(seq);
            node.num_fragments += 1;

            node.num_fragments >= node.max_fragments
        };

        if persist {
            self.store_fragment(addr, reference, max_fragments, seq, sms);
        }

        if !complete {
            return None;
        }

        let node = self.nodes.remove(&key)?;
        self.remove_node_dir(addr, reference, max_fragments);
        Some(node.fragments)
    }

    /// Drops every node whose first fragment arrived at or before `before`,
    /// along with its persisted files.
    pub fn expire(&mut self, before: SystemTime) {
        let expired: Vec<AssemblyKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.ts <= before)
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            if let Some(node) = self.nodes.remove(&key) {
                self.remove_node_dir(&key.addr, key.reference, node.max_fragments);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_dir(&self, addr: &Address, reference: u16, max_fragments: u8) -> Option<PathBuf> {
        let hex = addr.to_hex_string().ok()?;
        Some(
            self.dir
                .as_ref()?
                .join(format!("{hex}-{reference}-{max_fragments}")),
        )
    }

    fn store_fragment(
        &self,
        addr: &Address,
        reference: u16,
        max_fragments: u8,
        seq: u8,
        sms: &Sms,
    ) {
        let Some(dir) = self.node_dir(addr, reference, max_fragments) else {
            return;
        };

        let (pdu, tpdu_len) = match sms.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "cannot re-encode fragment for storage");
                return;
            }
        };

        let mut content = Vec::with_capacity(pdu.len() + 1);
        content.push(tpdu_len as u8);
        content.extend_from_slice(&pdu);

        if let Err(e) = fs::create_dir_all(&dir)
            .and_then(|_| fs::write(dir.join(format!("{seq:03}")), &content))
        {
            warn!(dir = %dir.display(), seq, error = %e, "cannot persist fragment");
        }
    }

    fn remove_node_dir(&self, addr: &Address, reference: u16, max_fragments: u8) {
        let Some(dir) = self.node_dir(addr, reference, max_fragments) else {
            return;
        };
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), error = %e, "cannot remove fragment dir");
            }
        }
    }

    fn reload(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot scan assembly dir");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            let Some((addr, reference, max_fragments)) = parse_node_dir_name(name) else {
                warn!(name, "skipping unparseable assembly dir");
                continue;
            };

            self.reload_node(&entry.path(), &addr, reference, max_fragments);
        }
    }

    fn reload_node(&mut self, dir: &Path, addr: &Address, reference: u16, max_fragments: u8) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let mut files: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        files.sort();

        for path in files {
            let Some(seq) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<u8>().ok())
            else {
                continue;
            };

            let Ok(content) = fs::read(&path) else {
                continue;
            };
            let Some((&tpdu_len, pdu)) = content.split_first() else {
                continue;
            };

            let sms = match Sms::decode(pdu, false, tpdu_len as usize) {
                Ok(sms) => sms,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "dropping corrupt fragment");
                    continue;
                }
            };

            let ts = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now());

            // completion during reload means the on-disk state was corrupt
            if self
                .insert_fragment(&sms, ts, addr, reference, max_fragments, seq, false)
                .is_some()
            {
                warn!(reference, "persisted fragment set was already complete");
            }
        }
    }
}

fn parse_node_dir_name(name: &str) -> Option<(Address, u16, u8)> {
    let mut parts = name.split('-');
    let addr = Address::from_hex_string(parts.next()?).ok()?;
    let reference = parts.next()?.parse().ok()?;
    let max_fragments = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((addr, reference, max_fragments))
}
