pub mod assembly;
pub mod cbs;
pub mod charset;
pub mod codec;
pub mod datatypes;
pub mod fragment;
pub mod reports;
pub mod text;
pub mod udh;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{CodecError, Sms, Tpdu, UserData, UserDataView};

// Re-export the types most callers need without reaching into submodules
pub use assembly::SmsAssembly;
pub use cbs::{Cbs, CbsAssembly, GeoScope, decode_cbs_text};
pub use charset::GsmDialect;
pub use datatypes::{
    Address, Deliver, DeliveryStatus, NumberType, NumberingPlan, Scts, StatusReport, Submit,
    ValidityPeriod,
};
pub use fragment::{PrepareError, prepare_datagram, prepare_text};
pub use reports::{MessageId, StatusReportAssembly};
pub use text::{decode_datagram, decode_text};
pub use udh::{AppPort, Concatenation, Iei, UdhIterator, extract_app_port, extract_concatenation};
