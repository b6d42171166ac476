use picofcm_proto::Characteristic;

/// Failures talking to a PicoFCM device
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("no PicoFCM device found")]
    DeviceNotFound,

    #[error("{0:?} characteristic not found")]
    CharacteristicNotFound(Characteristic),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unexpected pairing status value {0:?}")]
    UnexpectedValue(Vec<u8>),

    #[error(transparent)]
    Uuid(#[from] uuid::Error),

    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}
