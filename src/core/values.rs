//! Compound and enumerated value types stored in OMF properties.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rational number as stored on disk: two int32s at offsets 0 and 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Rational {
    /// On-disk size.
    pub const SIZE: usize = 8;

    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self { numerator, denominator }
    }

    /// Value as a float. Zero denominator yields infinity or NaN.
    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Mob identifier: prefix plus major/minor words, 12 bytes on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid {
    pub prefix: i32,
    pub major: u32,
    pub minor: u32,
}

impl Uid {
    /// On-disk size.
    pub const SIZE: usize = 12;

    pub const fn new(prefix: i32, major: u32, minor: u32) -> Self {
        Self { prefix, major, minor }
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08x}.{:08x}", self.prefix, self.major, self.minor)
    }
}

/// Wall-clock timestamp: seconds since the Unix epoch and a GMT flag.
///
/// On disk: u32 seconds at offset 0, one flag byte at offset 4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimeStamp {
    pub seconds: u32,
    pub is_gmt: bool,
}

impl TimeStamp {
    /// On-disk size.
    pub const SIZE: usize = 5;

    pub const fn new(seconds: u32, is_gmt: bool) -> Self {
        Self { seconds, is_gmt }
    }

    /// Current time, GMT.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Translate from the platform clock. Times outside the u32 range clamp.
    pub fn from_system_time(t: SystemTime) -> Self {
        let seconds = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
            .unwrap_or(0);
        Self { seconds, is_gmt: true }
    }

    /// Translate to the platform clock.
    pub fn to_system_time(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.seconds as u64)
    }
}

/// Two-byte major/minor version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionType {
    pub major: u8,
    pub minor: u8,
}

impl VersionType {
    /// On-disk size.
    pub const SIZE: usize = 2;

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Release classification inside a [`ProductVersion`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProductReleaseType {
    #[default]
    Unknown,
    Released,
    Debug,
    Patched,
    Beta,
    PrivateBuild,
}

impl ProductReleaseType {
    pub const fn to_disk(self) -> u16 {
        match self {
            Self::Unknown => 0,
            Self::Released => 1,
            Self::Debug => 2,
            Self::Patched => 3,
            Self::Beta => 4,
            Self::PrivateBuild => 5,
        }
    }

    pub const fn from_disk(v: u16) -> Self {
        match v {
            1 => Self::Released,
            2 => Self::Debug,
            3 => Self::Patched,
            4 => Self::Beta,
            5 => Self::PrivateBuild,
            _ => Self::Unknown,
        }
    }
}

/// Product version: five u16 fields, 10 bytes on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProductVersion {
    pub major: u16,
    pub minor: u16,
    pub tertiary: u16,
    pub release: ProductReleaseType,
    pub patch_level: u16,
}

impl ProductVersion {
    /// On-disk size.
    pub const SIZE: usize = 10;

    /// Version of this toolkit.
    pub fn toolkit() -> Self {
        let parse = |s: &str| s.parse::<u16>().unwrap_or(0);
        Self {
            major: parse(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: parse(env!("CARGO_PKG_VERSION_MINOR")),
            tertiary: parse(env!("CARGO_PKG_VERSION_PATCH")),
            release: ProductReleaseType::Released,
            patch_level: 0,
        }
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} ({:?}, patch {})",
            self.major, self.minor, self.tertiary, self.release, self.patch_level
        )
    }
}

/// Video frame layout.
///
/// Stored as int16 with codes that differ from declaration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameLayout {
    #[default]
    FullFrame,
    SingleField,
    SeparateFields,
    MixedFields,
}

impl FrameLayout {
    pub const fn to_disk(self) -> i16 {
        match self {
            Self::FullFrame => 0,
            Self::SeparateFields => 1,
            Self::SingleField => 2,
            Self::MixedFields => 3,
        }
    }

    pub const fn from_disk(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::FullFrame),
            1 => Some(Self::SeparateFields),
            2 => Some(Self::SingleField),
            3 => Some(Self::MixedFields),
            _ => None,
        }
    }

    /// Fields stored per frame.
    pub const fn fields_per_frame(self) -> u32 {
        match self {
            Self::SeparateFields | Self::MixedFields => 2,
            Self::FullFrame | Self::SingleField => 1,
        }
    }
}

/// Audio fade curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FadeType {
    #[default]
    None,
    LinearAmp,
    LinearPower,
}

impl FadeType {
    pub const fn to_disk(self) -> i16 {
        match self {
            Self::None => 0,
            Self::LinearAmp => 1,
            Self::LinearPower => 2,
        }
    }

    pub const fn from_disk(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::LinearAmp),
            2 => Some(Self::LinearPower),
            _ => None,
        }
    }
}

/// Hint for how an editor should adjust a component when trimming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EditHint {
    #[default]
    NoHint,
    Proportional,
    RelativeLeft,
    RelativeRight,
    RelativeFixed,
}

impl EditHint {
    pub const fn to_disk(self) -> i16 {
        match self {
            Self::NoHint => 0,
            Self::Proportional => 1,
            Self::RelativeLeft => 2,
            Self::RelativeRight => 3,
            Self::RelativeFixed => 4,
        }
    }

    pub const fn from_disk(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::NoHint),
            1 => Some(Self::Proportional),
            2 => Some(Self::RelativeLeft),
            3 => Some(Self::RelativeRight),
            4 => Some(Self::RelativeFixed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout_codes_are_not_ordinals() {
        assert_eq!(FrameLayout::SingleField.to_disk(), 2);
        assert_eq!(FrameLayout::SeparateFields.to_disk(), 1);
        for layout in [
            FrameLayout::FullFrame,
            FrameLayout::SingleField,
            FrameLayout::SeparateFields,
            FrameLayout::MixedFields,
        ] {
            assert_eq!(FrameLayout::from_disk(layout.to_disk()), Some(layout));
        }
        assert_eq!(FrameLayout::from_disk(9), None);
    }

    #[test]
    fn test_timestamp_epoch_translation() {
        let ts = TimeStamp::new(1_000_000, true);
        assert_eq!(TimeStamp::from_system_time(ts.to_system_time()), ts);
    }

    #[test]
    fn test_release_type_codes() {
        for v in 0..6u16 {
            assert_eq!(ProductReleaseType::from_disk(v).to_disk(), v);
        }
    }
}
