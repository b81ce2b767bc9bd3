// Wire value types for TS 23.040 TPDUs

pub mod address;
pub mod command;
pub mod dcs;
pub mod deliver;
pub mod status;
pub mod status_report;
pub mod submit;
pub mod timestamp;
pub mod validity;

pub use address::{Address, NumberType, NumberingPlan};
pub use command::Command;
pub use dcs::{
    CbsDataCoding, CbsLanguage, Charset, MessageClass, MwiDataCoding, MwiType, SmsDataCoding,
};
pub use deliver::{Deliver, DeliverAckReport, DeliverErrReport};
pub use status::{DeliveryStatus, StatusCategory};
pub use status_report::StatusReport;
pub use submit::{Submit, SubmitAckReport, SubmitErrReport};
pub use timestamp::Scts;
pub use validity::ValidityPeriod;
