use std::fmt;

/// Last known state of the most recent request to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Sending,
    Receiving,
    Adjusting,
    LedControlling,
    SensorUpdating,
    IftttTriggering,
    Completed,
    Failed,
    UpdateFailed,
}

impl Status {
    /// Label shown by the status reporter block.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "-",
            Self::Sending => "Sending...",
            Self::Receiving => "Receiving...",
            Self::Adjusting => "Adjusting...",
            Self::LedControlling => "LED Controling...",
            Self::SensorUpdating => "Sensor Updating...",
            Self::IftttTriggering => "IFTTT trigering...",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::UpdateFailed => "Update Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
