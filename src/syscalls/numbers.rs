//! System call numbers

/// Numeric values are the wire contract with userland code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Syscall {
    // Console
    Write = 0,
    Read = 1,
    ClearScreen = 2,

    // Timer
    Sleep = 3,

    // Video
    DrawRect = 4,

    // Time and state
    GetTicks = 5,
    GetRegisters = 6,
    GetTime = 7,

    // Sound and video
    PlaySound = 8,
    ChangeFontSize = 9,

    // Cycle counter
    ReadCycleCounter = 10,
    GetFrequency = 11,
    CyclesToMillis = 12,
    CyclesToMicros = 13,
    HasCounter = 14,
    HasInvariantCounter = 15,

    PutChar = 16,
}

impl Syscall {
    pub const COUNT: u64 = 17;
}

impl TryFrom<u64> for Syscall {
    type Error = u64;

    fn try_from(num: u64) -> Result<Self, Self::Error> {
        Ok(match num {
            0 => Self::Write,
            1 => Self::Read,
            2 => Self::ClearScreen,
            3 => Self::Sleep,
            4 => Self::DrawRect,
            5 => Self::GetTicks,
            6 => Self::GetRegisters,
            7 => Self::GetTime,
            8 => Self::PlaySound,
            9 => Self::ChangeFontSize,
            10 => Self::ReadCycleCounter,
            11 => Self::GetFrequency,
            12 => Self::CyclesToMillis,
            13 => Self::CyclesToMicros,
            14 => Self::HasCounter,
            15 => Self::HasInvariantCounter,
            16 => Self::PutChar,
            other => return Err(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_number_maps_back_to_itself() {
        for num in 0..Syscall::COUNT {
            let call = Syscall::try_from(num).unwrap();
            assert_eq!(call as u64, num);
        }
    }

    #[test]
    fn numbers_past_the_table_are_rejected() {
        assert_eq!(Syscall::try_from(Syscall::COUNT), Err(17));
        assert_eq!(Syscall::try_from(99), Err(99));
        assert_eq!(Syscall::try_from(u64::MAX), Err(u64::MAX));
    }

    #[test]
    fn wire_numbers_are_fixed() {
        assert_eq!(Syscall::Write as u64, 0);
        assert_eq!(Syscall::GetRegisters as u64, 6);
        assert_eq!(Syscall::CyclesToMicros as u64, 13);
        assert_eq!(Syscall::PutChar as u64, 16);
    }
}
