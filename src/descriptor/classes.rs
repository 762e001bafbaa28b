// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded categorical features.
//!
//! Every feature that reaches the state encoder is one of four classes, so
//! it fits in two bits. Thresholds are decimal byte counts and seconds.

/// Object size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeClass {
    /// Under 1 000 bytes.
    #[default]
    Small = 0,
    /// Under 1 000 000 bytes.
    Medium = 1,
    /// Under 1 000 000 000 bytes.
    Large = 2,
    Huge = 3,
}

impl SizeClass {
    #[must_use]
    pub fn from_bytes(bytes: u64) -> Self {
        if bytes < 1_000 {
            SizeClass::Small
        } else if bytes < 1_000_000 {
            SizeClass::Medium
        } else if bytes < 1_000_000_000 {
            SizeClass::Large
        } else {
            SizeClass::Huge
        }
    }

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// How long ago something was last touched, relative to the touch before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecencyClass {
    /// Under a minute.
    #[default]
    Recent = 0,
    /// Under an hour.
    LessRecent = 1,
    /// Under a day.
    MuchLessRecent = 2,
    Old = 3,
}

impl RecencyClass {
    /// Classify the gap between two timestamps in seconds.
    ///
    /// A clock that went backwards counts as no elapsed time.
    #[must_use]
    pub fn from_elapsed(previous_secs: u64, now_secs: u64) -> Self {
        let elapsed = now_secs.saturating_sub(previous_secs);
        if elapsed < 60 {
            RecencyClass::Recent
        } else if elapsed < 3_600 {
            RecencyClass::LessRecent
        } else if elapsed < 86_400 {
            RecencyClass::MuchLessRecent
        } else {
            RecencyClass::Old
        }
    }

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Popularity class derived from an access count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum FrequencyClass {
    #[default]
    NotFamous = 0,
    LessFamous = 1,
    EnoughFamous = 2,
    Famous = 3,
}

impl FrequencyClass {
    /// Thresholds for a single object: 0-1, 2-5, 6-20, 21+.
    #[must_use]
    pub fn for_object(accesses: u32) -> Self {
        match accesses {
            0..=1 => FrequencyClass::NotFamous,
            2..=5 => FrequencyClass::LessFamous,
            6..=20 => FrequencyClass::EnoughFamous,
            _ => FrequencyClass::Famous,
        }
    }

    /// Thresholds for a type or directory aggregate: 0-2, 3-5, 6-20, 21+.
    #[must_use]
    pub fn for_group(accesses: u32) -> Self {
        match accesses {
            0..=2 => FrequencyClass::NotFamous,
            3..=5 => FrequencyClass::LessFamous,
            6..=20 => FrequencyClass::EnoughFamous,
            _ => FrequencyClass::Famous,
        }
    }

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Coarse content format, derived from the key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Text = 0,
    Image = 1,
    Video = 2,
    Binary = 3,
}

impl FileType {
    /// Classify by the text after the last `.`; no extension is binary.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        let Some((_, ext)) = key.rsplit_once('.') else {
            return FileType::Binary;
        };
        match ext {
            "doc" | "docx" | "odt" | "pdf" | "rtf" | "tex" | "txt" | "wpd" => FileType::Text,
            "tif" | "jpg" | "png" | "gif" => FileType::Image,
            "mp4" | "mov" | "wmv" | "avi" => FileType::Video,
            _ => FileType::Binary,
        }
    }

    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Binary => "binary",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Containing directory of a key: everything before the last `/`.
#[must_use]
pub fn directory_of(key: &str) -> &str {
    key.rsplit_once('/').map_or("", |(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_class_boundaries() {
        assert_eq!(SizeClass::from_bytes(0), SizeClass::Small);
        assert_eq!(SizeClass::from_bytes(999), SizeClass::Small);
        assert_eq!(SizeClass::from_bytes(1_000), SizeClass::Medium);
        assert_eq!(SizeClass::from_bytes(999_999), SizeClass::Medium);
        assert_eq!(SizeClass::from_bytes(1_000_000), SizeClass::Large);
        assert_eq!(SizeClass::from_bytes(1_000_000_000), SizeClass::Huge);
    }

    #[test]
    fn test_recency_class_boundaries() {
        assert_eq!(RecencyClass::from_elapsed(100, 159), RecencyClass::Recent);
        assert_eq!(RecencyClass::from_elapsed(100, 160), RecencyClass::LessRecent);
        assert_eq!(RecencyClass::from_elapsed(0, 3_599), RecencyClass::LessRecent);
        assert_eq!(RecencyClass::from_elapsed(0, 3_600), RecencyClass::MuchLessRecent);
        assert_eq!(RecencyClass::from_elapsed(0, 86_400), RecencyClass::Old);
        // Clock skew
        assert_eq!(RecencyClass::from_elapsed(500, 10), RecencyClass::Recent);
    }

    #[test]
    fn test_object_frequency() {
        assert_eq!(FrequencyClass::for_object(0), FrequencyClass::NotFamous);
        assert_eq!(FrequencyClass::for_object(1), FrequencyClass::NotFamous);
        assert_eq!(FrequencyClass::for_object(2), FrequencyClass::LessFamous);
        assert_eq!(FrequencyClass::for_object(5), FrequencyClass::LessFamous);
        assert_eq!(FrequencyClass::for_object(6), FrequencyClass::EnoughFamous);
        assert_eq!(FrequencyClass::for_object(20), FrequencyClass::EnoughFamous);
        assert_eq!(FrequencyClass::for_object(21), FrequencyClass::Famous);
    }

    #[test]
    fn test_group_frequency() {
        assert_eq!(FrequencyClass::for_group(2), FrequencyClass::NotFamous);
        assert_eq!(FrequencyClass::for_group(3), FrequencyClass::LessFamous);
        assert_eq!(FrequencyClass::for_group(6), FrequencyClass::EnoughFamous);
        assert_eq!(FrequencyClass::for_group(21), FrequencyClass::Famous);
    }

    #[test]
    fn test_file_type_from_key() {
        assert_eq!(FileType::from_key("/a/b.txt"), FileType::Text);
        assert_eq!(FileType::from_key("/a/b.pdf"), FileType::Text);
        assert_eq!(FileType::from_key("/img/x.png"), FileType::Image);
        assert_eq!(FileType::from_key("/v/clip.mp4"), FileType::Video);
        assert_eq!(FileType::from_key("/v/archive.tar"), FileType::Binary);
        assert_eq!(FileType::from_key("/no/extension"), FileType::Binary);
        assert_eq!(FileType::from_key("README."), FileType::Binary);
    }

    #[test]
    fn test_directory_of() {
        assert_eq!(directory_of("/a/b.txt"), "/a");
        assert_eq!(directory_of("/top.txt"), "");
        assert_eq!(directory_of("bare"), "");
        assert_eq!(directory_of("x/y/z"), "x/y");
    }
}
