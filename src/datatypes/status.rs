// TP-Status of SMS-STATUS-REPORT, TS 23.040 9.2.3.15

/// Raw TP-Status octet with the 23.040 classification ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStatus(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Completed,
    /// Still trying, a further report will follow
    Temporary,
    PermanentFailure,
    /// Gave up retrying
    TemporaryFailure,
    Reserved,
}

impl DeliveryStatus {
    pub const RECEIVED: DeliveryStatus = DeliveryStatus(0x00);
    pub const FORWARDED_UNCONFIRMED: DeliveryStatus = DeliveryStatus(0x01);
    pub const TRYING_CONGESTION: DeliveryStatus = DeliveryStatus(0x20);
    pub const PERMANENT_ERROR: DeliveryStatus = DeliveryStatus(0x45);
    pub const TEMPORARY_ERROR_FINAL: DeliveryStatus = DeliveryStatus(0x60);

    pub fn category(self) -> StatusCategory {
        match self.0 {
            0x00..=0x1F => StatusCategory::Completed,
            0x20..=0x2F => StatusCategory::Temporary,
            0x40..=0x4F => StatusCategory::PermanentFailure,
            0x60..=0x6F => StatusCategory::TemporaryFailure,
            _ => StatusCategory::Reserved,
        }
    }

    /// The report says nothing final; keep waiting
    pub fn is_intermediate(self) -> bool {
        matches!(
            self.category(),
            StatusCategory::Temporary | StatusCategory::Reserved
        )
    }

    pub fn is_delivered(self) -> bool {
        self.category() == StatusCategory::Completed
    }
}

impl From<u8> for DeliveryStatus {
    fn from(st: u8) -> DeliveryStatus {
        DeliveryStatus(st)
    }
}

impl From<DeliveryStatus> for u8 {
    fn from(st: DeliveryStatus) -> u8 {
        st.0
    }
}
