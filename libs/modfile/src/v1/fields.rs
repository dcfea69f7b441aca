//! Descriptor fields with their own decoding rules.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};

const KIB: f64 = 1024.0;

/// Size in bytes, written as an integer or as a human-readable string
/// such as `64Mb` or `1.5G`. Units are binary (1K = 1024).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn parse(s: &str) -> Result<Self, String> {
        let normalized = s.trim().to_uppercase();
        let Some(split) = normalized.find(|c: char| c.is_alphabetic()) else {
            return Err(format!(
                "invalid size '{s}': must be a positive number with a unit like K, M, MiB, G or GB"
            ));
        };
        let (number, unit) = normalized.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| *v > 0.0)
            .ok_or_else(|| format!("invalid size '{s}': must be a positive number"))?;
        let multiplier = match unit {
            "E" | "EB" | "EIB" => KIB.powi(6),
            "P" | "PB" | "PIB" => KIB.powi(5),
            "T" | "TB" | "TIB" => KIB.powi(4),
            "G" | "GB" | "GIB" => KIB.powi(3),
            "M" | "MB" | "MIB" => KIB.powi(2),
            "K" | "KB" | "KIB" => KIB,
            "B" => 1.0,
            _ => return Err(format!("invalid size '{s}': unknown unit '{unit}'")),
        };
        // Saturates on overflow.
        Ok(ByteSize((value * multiplier) as u64))
    }
}

struct ByteSizeVisitor;

impl Visitor<'_> for ByteSizeVisitor {
    type Value = ByteSize;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a byte count or a size string like '64Mb'")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ByteSize, E> {
        Ok(ByteSize(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ByteSize, E> {
        u64::try_from(v)
            .map(ByteSize)
            .map_err(|_| E::custom(format!("invalid size: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ByteSize, E> {
        ByteSize::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

/// Unix permission bits written in octal, e.g. `"777"` or `"0750"`.
///
/// The scalar is always read as text, so `mode: 770` means `0o770` while
/// YAML integer forms such as `0o770` or `0x1FF` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    pub fn parse(s: &str) -> Result<Self, String> {
        u32::from_str_radix(s, 8)
            .map(FileMode)
            .map_err(|e| format!("invalid file mode '{s}': {e}"))
    }
}

struct FileModeVisitor;

impl Visitor<'_> for FileModeVisitor {
    type Value = FileMode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an octal file mode like '0770'")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FileMode, E> {
        FileMode::parse(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(FileModeVisitor)
    }
}

/// A command line given either as one string or as a list of arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command(pub Vec<String>);

struct CommandVisitor;

impl<'de> Visitor<'de> for CommandVisitor {
    type Value = Command;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or a list of strings")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Command, E> {
        Ok(Command(vec![v.to_owned()]))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Command, E> {
        Ok(Command::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Command, A::Error> {
        let mut args = Vec::new();
        while let Some(arg) = seq.next_element::<String>()? {
            args.push(arg);
        }
        Ok(Command(args))
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CommandVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_from_string() {
        assert_eq!(ByteSize::parse("64Mb").unwrap(), ByteSize(67_108_864));
        assert_eq!(ByteSize::parse("1k").unwrap(), ByteSize(1024));
        assert_eq!(ByteSize::parse("2GiB").unwrap(), ByteSize(2 * 1024 * 1024 * 1024));
        assert_eq!(ByteSize::parse("1.5K").unwrap(), ByteSize(1536));
        assert_eq!(ByteSize::parse("10B").unwrap(), ByteSize(10));
    }

    #[test]
    fn byte_size_rejects_bad_input() {
        assert!(ByteSize::parse("1024").is_err());
        assert!(ByteSize::parse("0M").is_err());
        assert!(ByteSize::parse("-1M").is_err());
        assert!(ByteSize::parse("12Q").is_err());
        assert!(ByteSize::parse("M").is_err());
    }

    #[test]
    fn byte_size_decodes_int_or_string() {
        let size: ByteSize = serde_yaml::from_str("4096").unwrap();
        assert_eq!(size, ByteSize(4096));
        let size: ByteSize = serde_yaml::from_str("64Mb").unwrap();
        assert_eq!(size, ByteSize(67_108_864));
        assert!(serde_yaml::from_str::<ByteSize>("-5").is_err());
        assert!(serde_yaml::from_str::<ByteSize>("[1]").is_err());
    }

    #[test]
    fn file_mode_is_octal() {
        let mode: FileMode = serde_yaml::from_str("'777'").unwrap();
        assert_eq!(mode, FileMode(0o777));
        let mode: FileMode = serde_yaml::from_str("'0750'").unwrap();
        assert_eq!(mode, FileMode(0o750));
        let mode: FileMode = serde_yaml::from_str("770").unwrap();
        assert_eq!(mode, FileMode(0o770));
        assert!(serde_yaml::from_str::<FileMode>("'789'").is_err());
        assert!(serde_yaml::from_str::<FileMode>("rwx").is_err());
    }

    #[test]
    fn file_mode_rejects_yaml_integer_forms() {
        assert!(serde_yaml::from_str::<FileMode>("0o770").is_err());
        assert!(serde_yaml::from_str::<FileMode>("0x1FF").is_err());
        let mode: FileMode = serde_yaml::from_str("0770").unwrap();
        assert_eq!(mode, FileMode(0o770));
    }

    #[test]
    fn command_from_string_or_list() {
        let cmd: Command = serde_yaml::from_str("run --fast").unwrap();
        assert_eq!(cmd, Command(vec!["run --fast".into()]));
        let cmd: Command = serde_yaml::from_str("[run, --fast]").unwrap();
        assert_eq!(cmd, Command(vec!["run".into(), "--fast".into()]));
        assert!(serde_yaml::from_str::<Command>("{a: b}").is_err());
    }
}
