// Correlates delivery status reports with sent message fragments
// One fixed-layout record file per (destination, logical message id)

use crate::codec::{self, CodecError};
use crate::datatypes::{Address, StatusCategory, StatusReport};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const MSGID_LEN: usize = 20;

/// Identifier of a logical (possibly multi-fragment) message, typically a
/// digest of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub [u8; MSGID_LEN]);

impl MessageId {
    pub fn from_hex(hex: &str) -> Option<MessageId> {
        let raw = codec::decode_hex(hex)?;
        Some(MessageId(raw.try_into().ok()?))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode_hex(&self.0))
    }
}

#[derive(Debug, Clone)]
struct ReportNode {
    /// One bit per outstanding message reference
    bitmap: [u8; 32],
    expiration: SystemTime,
    total_mrs: u8,
    sent_mrs: u8,
    deliverable: bool,
}

impl ReportNode {
    fn is_set(&self, mr: u8) -> bool {
        self.bitmap[usize::from(mr) / 8] & (1 << (mr % 8)) != 0
    }

    fn set(&mut self, mr: u8) {
        self.bitmap[usize::from(mr) / 8] |= 1 << (mr % 8);
    }

    fn clear(&mut self, mr: u8) {
        self.bitmap[usize::from(mr) / 8] &= !(1 << (mr % 8));
    }

    fn all_clear(&self) -> bool {
        self.bitmap.iter().all(|&b| b == 0)
    }
}

/// Tracks which fragments of each sent message still await a status report.
/// Node state is written through to `dir` when given, and reloaded on
/// construction.
pub struct StatusReportAssembly {
    dir: Option<PathBuf>,
    // outer key is the destination address display form
    nodes: HashMap<String, HashMap<MessageId, ReportNode>>,
}

impl StatusReportAssembly {
    pub fn new(dir: Option<PathBuf>) -> StatusReportAssembly {
        let mut assembly = StatusReportAssembly {
            dir,
            nodes: HashMap::new(),
        };

        if let Some(dir) = assembly.dir.clone() {
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "cannot create report dir");
                assembly.dir = None;
            } else {
                assembly.reload();
            }
        }

        assembly
    }

    /// Registers that the fragment with message reference `mr` of message
    /// `msgid` was sent to `to`, out of `total_mrs` fragments overall.
    pub fn add_fragment(
        &mut self,
        msgid: &MessageId,
        to: &Address,
        mr: u8,
        expiration: SystemTime,
        total_mrs: u8,
    ) {
        let node = self
            .nodes
            .entry(to.to_string())
            .or_default()
            .entry(*msgid)
            .or_insert(ReportNode {
                bitmap: [0u8; 32],
                expiration,
                total_mrs,
                sent_mrs: 0,
                deliverable: true,
            });

        node.set(mr);
        node.sent_mrs += 1;
        node.expiration = expiration;
        node.total_mrs = total_mrs;

        let node = node.clone();
        self.store_node(to, msgid, &node);
    }

    /// Feeds one incoming status report. Returns the logical message id and
    /// its aggregate outcome once the last outstanding reference resolves;
    /// `None` while reports are still pending or when nothing matches.
    pub fn report(&mut self, report: &StatusReport) -> Option<(MessageId, bool)> {
        let delivered = match report.st.category() {
            StatusCategory::Completed => true,
            StatusCategory::PermanentFailure => false,
            // transitional states; a further report will follow
            StatusCategory::Temporary
            | StatusCategory::TemporaryFailure
            | StatusCategory::Reserved => return None,
        };

        let (addr_key, msgid) = self.find_node(&report.raddr, report.mr)?;

        let addr_nodes = self.nodes.get_mut(&addr_key)?;
        let node = addr_nodes.get_mut(&msgid)?;

        node.clear(report.mr);
        node.deliverable = node.deliverable && delivered;

        if node.all_clear() && node.sent_mrs == node.total_mrs {
            let deliverable = node.deliverable;
            addr_nodes.remove(&msgid);
            if addr_nodes.is_empty() {
                self.nodes.remove(&addr_key);
            }
            self.remove_node_file(&addr_key, &msgid);
            return Some((msgid, deliverable));
        }

        let node = node.clone();
        self.store_node_by_key(&addr_key, &msgid, &node);
        None
    }

    /// Drops every node expiring at or before `before`.
    pub fn expire(&mut self, before: SystemTime) {
        let mut expired: Vec<(String, MessageId)> = Vec::new();

        for (addr, nodes) in &self.nodes {
            for (msgid, node) in nodes {
                if node.expiration <= before {
                    expired.push((addr.clone(), *msgid));
                }
            }
        }

        for (addr, msgid) in expired {
            if let Some(nodes) = self.nodes.get_mut(&addr) {
                nodes.remove(&msgid);
                if nodes.is_empty() {
                    self.nodes.remove(&addr);
                }
            }
            self.remove_node_file(&addr, &msgid);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Exact address match first, then a fuzzy pass tolerating the network
    /// reformatting a number between national and international form: the
    /// trailing six characters must agree and the reference bit must be set.
    fn find_node(&self, raddr: &Address, mr: u8) -> Option<(String, MessageId)> {
        let exact = raddr.to_string();

        if let Some(nodes) = self.nodes.get(&exact) {
            for (msgid, node) in nodes {
                if node.is_set(mr) {
                    return Some((exact, *msgid));
                }
            }
        }

        for (addr, nodes) in &self.nodes {
            if !trailing_digits_match(addr, &exact) {
                continue;
            }
            for (msgid, node) in nodes {
                if node.is_set(mr) {
                    return Some((addr.clone(), *msgid));
                }
            }
        }

        None
    }

    fn node_path(&self, addr_key: &str, msgid: &MessageId) -> Option<PathBuf> {
        let addr = Address::from(addr_key);
        let hex = addr.to_hex_string().ok()?;
        Some(self.dir.as_ref()?.join(format!("{hex}-{msgid}")))
    }

    fn store_node(&self, to: &Address, msgid: &MessageId, node: &ReportNode) {
        self.store_node_by_key(&to.to_string(), msgid, node);
    }

    fn store_node_by_key(&self, addr_key: &str, msgid: &MessageId, node: &ReportNode) {
        let Some(path) = self.node_path(addr_key, msgid) else {
            return;
        };

        let expiration = node
            .expiration
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut record = Vec::with_capacity(43);
        record.extend_from_slice(&node.bitmap);
        record.extend_from_slice(&expiration.to_be_bytes());
        record.push(node.total_mrs);
        record.push(node.sent_mrs);
        record.push(node.deliverable as u8);

        if let Err(e) = fs::write(&path, &record) {
            warn!(path = %path.display(), error = %e, "cannot persist report node");
        }
    }

    fn remove_node_file(&self, addr_key: &str, msgid: &MessageId) {
        let Some(path) = self.node_path(addr_key, msgid) else {
            return;
        };
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "cannot remove report node");
            }
        }
    }

    fn reload(&mut self) {
        let Some(dir) = self.dir.clone() else { return };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot scan report dir");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            let Some((addr, msgid)) = parse_node_file_name(name) else {
                warn!(name, "skipping unparseable report record");
                continue;
            };

            let Ok(record) = fs::read(entry.path()) else {
                continue;
            };
            let Some(node) = parse_record(&record) else {
                warn!(name, "dropping corrupt report record");
                continue;
            };

            self.nodes
                .entry(addr.to_string())
                .or_default()
                .insert(msgid, node);
        }
    }
}

fn trailing_digits_match(a: &str, b: &str) -> bool {
    let n = a.len().min(b.len()).min(6);
    n > 0 && a.as_bytes()[a.len() - n..] == b.as_bytes()[b.len() - n..]
}

fn parse_node_file_name(name: &str) -> Option<(Address, MessageId)> {
    let (addr_hex, msgid_hex) = name.split_once('-')?;
    let addr = Address::from_hex_string(addr_hex).ok()?;
    let msgid = MessageId::from_hex(msgid_hex)?;
    Some((addr, msgid))
}

fn parse_record(record: &[u8]) -> Option<ReportNode> {
    if record.len() != 43 {
        return None;
    }

    let mut bitmap = [0u8; 32];
    bitmap.copy_from_slice(&record[..32]);

    let secs = u64::from_be_bytes(record[32..40].try_into().ok()?);

    Some(ReportNode {
        bitmap,
        expiration: UNIX_EPOCH + Duration::from_secs(secs),
        total_mrs: record[40],
        sent_mrs: record[41],
        deliverable: record[42] != 0,
    })
}

// keep the error type in the public surface for callers that parse ids
impl std::str::FromStr for MessageId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<MessageId, CodecError> {
        MessageId::from_hex(s).ok_or(CodecError::InvalidHex)
    }
}
