use std::fmt;

/// Which way audio flows through a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceDirection {
    Input,
    Output,
}

/// An audio device reported by the audio subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub direction: DeviceDirection,
    pub is_default: bool,
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_str = if self.is_default { " (default)" } else { "" };
        writeln!(f, "{}{}", self.name, default_str)?;
        write!(f, "  id: {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_marks_default() {
        let source = AudioSource {
            id: "hw:0".into(),
            name: "Built-in Microphone".into(),
            direction: DeviceDirection::Input,
            is_default: true,
        };
        assert_eq!(source.to_string(), "Built-in Microphone (default)\n  id: hw:0");
    }
}
