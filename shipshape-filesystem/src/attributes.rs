use std::{fmt, fmt::Debug, str::FromStr};

use nix::sys::stat::{Mode as SysMode, SFlag};
use serde::Deserialize;

/// The default mode for directories (`0o755` or `rwxr-xr-x`)
pub const DEFAULT_DIRECTORY_MODE: Mode = Mode(0o755);
/// The default mode for files (`0o644` or `rw-r--r--`)
pub const DEFAULT_FILE_MODE: Mode = Mode(0o644);

/// A full mode bitmask, file type marker bits included
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Mode(u16);

impl Mode {
    /// Returns the inner numeric value of the mode
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns only the permission bits, special bits included
    pub fn permissions(&self) -> u16 {
        self.0 & 0o7777
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mode(0o{:o})", self.0)
    }
}

impl From<u16> for Mode {
    fn from(value: u16) -> Self {
        Mode(value)
    }
}

impl From<Mode> for u16 {
    fn from(mode: Mode) -> Self {
        mode.0
    }
}

impl From<Mode> for u32 {
    fn from(mode: Mode) -> Self {
        mode.0 as u32
    }
}

/// Owner, group and permissions observed on an existing node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attrs {
    /// The owner of the node, by name, or its decimal uid if unresolvable
    pub owner: String,
    /// The group of the node, by name, or its decimal gid if unresolvable
    pub group: String,
    /// The permission bits of the node
    pub mode: Mode,
}

/// Owner, group and mode to apply to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAttrs<'a> {
    /// The owner to set, by name
    pub owner: &'a str,
    /// The group to set, by name
    pub group: &'a str,
    /// The full [`Mode`] to set
    pub mode: Mode,
}

/// The object type a computed mode is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    /// A regular file (`S_IFREG`)
    Regular,
    /// A directory (`S_IFDIR`)
    Directory,
}

impl BaseType {
    fn marker(self) -> u16 {
        match self {
            BaseType::Regular => SFlag::S_IFREG.bits() as u16,
            BaseType::Directory => SFlag::S_IFDIR.bits() as u16,
        }
    }
}

// Each digit position selects from one triple of mode bits, keyed by the
// digit's {1, 2, 4} bit values
const DIGIT_BITS: [[SysMode; 3]; 4] = [
    [SysMode::S_ISVTX, SysMode::S_ISGID, SysMode::S_ISUID],
    [SysMode::S_IXUSR, SysMode::S_IWUSR, SysMode::S_IRUSR],
    [SysMode::S_IXGRP, SysMode::S_IWGRP, SysMode::S_IRGRP],
    [SysMode::S_IXOTH, SysMode::S_IWOTH, SysMode::S_IROTH],
];

/// Combines a base object-type marker with the bits selected by a
/// permission string into a final [`Mode`]
pub fn compute_mode(base: BaseType, perms: &Perms) -> Mode {
    let mut bits = base.marker();
    for (digit, triple) in perms.digit_values().into_iter().zip(DIGIT_BITS) {
        for (value, bit) in [1u8, 2, 4].into_iter().zip(triple) {
            if digit & value != 0 {
                bits |= bit.bits() as u16;
            }
        }
    }
    Mode(bits)
}

/// A permission string in its canonical four octal digit form, e.g. `"0755"`
///
/// Three digit input is accepted and left-padded with `0`; anything else
/// that is not four octal digits is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Perms(String);

/// Rejection of a malformed permission string
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("permission string must be three or four octal digits; got {0:?}")]
pub struct PermsError(String);

impl Perms {
    /// The canonical four digit string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical string for the permission bits of an on-disk mode
    pub fn from_mode(mode: Mode) -> Perms {
        Perms(format!("{:04o}", mode.permissions()))
    }

    fn digit_values(&self) -> [u8; 4] {
        let mut values = [0u8; 4];
        for (value, ch) in values.iter_mut().zip(self.0.chars()) {
            *value = ch as u8 - b'0';
        }
        values
    }
}

impl TryFrom<&str> for Perms {
    type Error = PermsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if !(3..=4).contains(&value.len()) || !value.chars().all(|c| ('0'..='7').contains(&c)) {
            return Err(PermsError(value.to_owned()));
        }
        let mut digits = value.to_owned();
        while digits.len() < 4 {
            digits.insert(0, '0');
        }
        Ok(Perms(digits))
    }
}

impl TryFrom<String> for Perms {
    type Error = PermsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().try_into()
    }
}

impl FromStr for Perms {
    type Err = PermsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_padding() {
        assert_eq!(Perms::try_from("755").unwrap().as_str(), "0755");
        assert_eq!(Perms::try_from("0644").unwrap().as_str(), "0644");
    }

    #[test]
    fn malformed_perms_rejected() {
        for bad in ["", "7", "75", "07555", "8755", "075x", "rwxr"] {
            assert!(Perms::try_from(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn compute_basic_file_mode() {
        let perms = "755".parse().unwrap();
        let mode = compute_mode(BaseType::Regular, &perms);
        assert_eq!(
            mode.value(),
            SFlag::S_IFREG.bits() as u16 | 0o755,
            "got {mode:?}"
        );
        // No special bits selected
        assert_eq!(mode.value() & 0o7000, 0);
    }

    #[test]
    fn compute_setuid_file_mode() {
        let perms = "4755".parse().unwrap();
        let mode = compute_mode(BaseType::Regular, &perms);
        assert_eq!(mode.value(), SFlag::S_IFREG.bits() as u16 | 0o4755);
    }

    #[test]
    fn compute_sticky_directory_mode() {
        let perms = "1777".parse().unwrap();
        let mode = compute_mode(BaseType::Directory, &perms);
        assert_eq!(mode.value(), SFlag::S_IFDIR.bits() as u16 | 0o1777);
    }

    #[test]
    fn compute_is_total_over_octal_digits() {
        for a in 0..=7u16 {
            for b in 0..=7u16 {
                let digits = format!("0{a}{b}0");
                let perms: Perms = digits.parse().unwrap();
                let mode = compute_mode(BaseType::Regular, &perms);
                assert_eq!(mode.permissions(), a << 6 | b << 3);
            }
        }
    }

    #[test]
    fn observed_perms_from_mode() {
        assert_eq!(Perms::from_mode(Mode(0o40755)).as_str(), "0755");
        assert_eq!(Perms::from_mode(Mode(0o644)).as_str(), "0644");
        let setuid = SFlag::S_IFREG.bits() as u16 | 0o4755;
        assert_eq!(Perms::from_mode(Mode(setuid)).as_str(), "4755");
    }
}
