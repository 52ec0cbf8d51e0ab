//! Uploaded artwork: metadata extraction, print-quality grading,
//! validation and versioned conversions.
//!
//! Dimensions and resolution are read straight from PNG/JPEG headers;
//! full decoding is never needed for grading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Extensions the shop accepts for upload.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "eps", "ai", "svg"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Png,
    Jpeg,
    Pdf,
    Tiff,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FileFormat::Png => "png",
            FileFormat::Jpeg => "jpeg",
            FileFormat::Pdf => "pdf",
            FileFormat::Tiff => "tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Png => "png",
            FileFormat::Jpeg => "jpg",
            FileFormat::Pdf => "pdf",
            FileFormat::Tiff => "tif",
        }
    }

    /// Sniff the format from magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<FileFormat> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(FileFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(FileFormat::Jpeg)
        } else if bytes.starts_with(b"%PDF") {
            Some(FileFormat::Pdf)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(FileFormat::Tiff)
        } else {
            None
        }
    }
}

/// Color mode inferred from the channel count of the image header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Grayscale,
    Rgb,
    Cmyk,
}

impl ColorMode {
    pub fn from_channels(channels: u8) -> Option<ColorMode> {
        match channels {
            1 | 2 => Some(ColorMode::Grayscale),
            3 => Some(ColorMode::Rgb),
            4 => Some(ColorMode::Cmyk),
            _ => None,
        }
    }
}

/// Coarse print-quality label derived from resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
    PrintReady,
}

impl QualityTier {
    pub fn from_dpi(dpi: u32) -> QualityTier {
        if dpi >= 300 {
            QualityTier::PrintReady
        } else if dpi >= 150 {
            QualityTier::High
        } else if dpi >= 72 {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub format: FileFormat,
    pub width: u32,
    pub height: u32,
    pub dpi: Option<u32>,
    pub color_mode: Option<ColorMode>,
}

/// Parse image dimensions, channel count and resolution from the file
/// header. Returns `None` for formats that carry no raster header (PDF,
/// vector files) or for corrupt data.
pub fn extract_metadata(bytes: &[u8]) -> Option<ImageMetadata> {
    match FileFormat::detect(bytes)? {
        FileFormat::Png => parse_png(bytes),
        FileFormat::Jpeg => parse_jpeg(bytes),
        FileFormat::Pdf | FileFormat::Tiff => None,
    }
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

/// IHDR gives dimensions and color type; the optional pHYs chunk gives
/// pixels per metre, converted to DPI.
fn parse_png(bytes: &[u8]) -> Option<ImageMetadata> {
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    let width = be_u32(bytes, 16)?;
    let height = be_u32(bytes, 20)?;
    let color_type = *bytes.get(25)?;
    let channels = match color_type {
        0 => 1, // grayscale
        2 => 3, // truecolor
        3 => 1, // indexed
        4 => 2, // grayscale + alpha
        6 => 4, // truecolor + alpha
        _ => return None,
    };

    let mut dpi = None;
    let mut pos = 8usize;
    while pos + 8 <= bytes.len() {
        let len = be_u32(bytes, pos)? as usize;
        let chunk_type = bytes.get(pos + 4..pos + 8)?;
        if chunk_type == b"pHYs" && len >= 9 {
            let ppm = be_u32(bytes, pos + 8)?;
            let unit = *bytes.get(pos + 16)?;
            if unit == 1 {
                // pixels per metre -> dots per inch, rounded
                dpi = Some(((u64::from(ppm) * 254 + 5_000) / 10_000) as u32);
            }
            break;
        }
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            break;
        }
        pos = pos.checked_add(len)?.checked_add(12)?;
    }

    Some(ImageMetadata {
        format: FileFormat::Png,
        width,
        height,
        dpi,
        color_mode: ColorMode::from_channels(channels),
    })
}

/// Walk JPEG segments: SOF gives dimensions and channel count, the JFIF
/// APP0 segment gives pixel density.
fn parse_jpeg(bytes: &[u8]) -> Option<ImageMetadata> {
    let mut dpi = None;
    let mut pos = 2usize;
    while pos + 4 <= bytes.len() {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        let len = be_u16(bytes, pos + 2)? as usize;
        match marker {
            // SOF0..SOF15, excluding DHT/JPG/DAC which share the range
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = u32::from(be_u16(bytes, pos + 5)?);
                let width = u32::from(be_u16(bytes, pos + 7)?);
                let channels = *bytes.get(pos + 9)?;
                return Some(ImageMetadata {
                    format: FileFormat::Jpeg,
                    width,
                    height,
                    dpi,
                    color_mode: ColorMode::from_channels(channels),
                });
            }
            // APP0 / JFIF density
            0xE0 if bytes.get(pos + 4..pos + 9)? == b"JFIF\0" => {
                let units = *bytes.get(pos + 11)?;
                let density = u32::from(be_u16(bytes, pos + 12)?);
                dpi = match units {
                    1 => Some(density),
                    2 => Some((density * 254 + 50) / 100), // dots per cm
                    _ => None,
                };
            }
            // Start of scan: no SOF seen before image data, give up
            0xDA => return None,
            _ => {}
        }
        pos = pos.checked_add(2)?.checked_add(len)?;
    }
    None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Ready,
    Rejected,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processing => "processing",
            FileStatus::Ready => "ready",
            FileStatus::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Warning,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

/// Structured validation outcome. A file is valid iff it has zero
/// error-kind issues.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileValidation {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileVersion {
    pub number: u32,
    pub filename: String,
    pub created_by: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrintFile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub size: u64,
    pub status: FileStatus,
    pub detected_format: Option<FileFormat>,
    pub metadata: Option<ImageMetadata>,
    pub quality: Option<QualityTier>,
    pub rejection_reason: Option<String>,
    pub versions: Vec<FileVersion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrintFile {
    pub fn new(owner_id: Uuid, filename: impl Into<String>, size: u64) -> Self {
        let filename = filename.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            filename: filename.clone(),
            size,
            status: FileStatus::Uploaded,
            detected_format: None,
            metadata: None,
            quality: None,
            rejection_reason: None,
            versions: vec![FileVersion {
                number: 1,
                filename,
                created_by: owner_id,
                description: "original upload".into(),
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn extension(&self) -> Option<String> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn mark_processing(&mut self) {
        self.status = FileStatus::Processing;
        self.touch();
    }

    /// Record the outcome of header inspection and mark the file ready.
    pub fn apply_inspection(&mut self, format: FileFormat, metadata: Option<ImageMetadata>) {
        self.detected_format = Some(format);
        self.quality = metadata.as_ref().and_then(|m| m.dpi).map(QualityTier::from_dpi);
        self.metadata = metadata;
        self.status = FileStatus::Ready;
        self.touch();
    }

    pub fn mark_rejected(&mut self, reason: impl Into<String>) {
        self.status = FileStatus::Rejected;
        self.rejection_reason = Some(reason.into());
        self.touch();
    }

    pub fn validate(&self) -> FileValidation {
        let mut issues = vec![];
        let mut recommendations = vec![];

        match self.extension() {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => {}
            Some(ext) => issues.push(ValidationIssue {
                kind: IssueKind::Error,
                message: format!("unsupported file extension '.{ext}'"),
            }),
            None => issues.push(ValidationIssue {
                kind: IssueKind::Error,
                message: "file has no extension".into(),
            }),
        }

        if self.status == FileStatus::Rejected {
            issues.push(ValidationIssue {
                kind: IssueKind::Error,
                message: self
                    .rejection_reason
                    .clone()
                    .unwrap_or_else(|| "file failed processing".into()),
            });
        }

        if let Some(meta) = &self.metadata {
            match self.quality {
                Some(QualityTier::Low) | Some(QualityTier::Medium) => {
                    issues.push(ValidationIssue {
                        kind: IssueKind::Warning,
                        message: format!(
                            "resolution {} DPI is below print quality",
                            meta.dpi.unwrap_or(0)
                        ),
                    });
                    recommendations.push("resupply the artwork at 300 DPI or higher".into());
                }
                None => {
                    issues.push(ValidationIssue {
                        kind: IssueKind::Warning,
                        message: "image carries no resolution information".into(),
                    });
                }
                _ => {}
            }
            if meta.color_mode == Some(ColorMode::Rgb) {
                recommendations.push("convert colors to CMYK before production".into());
            }
        }

        let valid = !issues.iter().any(|i| i.kind == IssueKind::Error);
        FileValidation { valid, issues, recommendations }
    }

    /// Produce a converted copy as a new version; the original is never
    /// mutated.
    pub fn convert_to(&mut self, format: FileFormat, by: Uuid) -> Result<FileVersion> {
        if self.status != FileStatus::Ready {
            return Err(Error::InvalidState(format!(
                "file must be ready before conversion, status is {}",
                self.status.as_str()
            )));
        }
        let stem = self
            .filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(self.filename.as_str())
            .to_string();
        let filename = format!("{stem}.{}", format.extension());
        let description = format!("converted to {}", format.as_str());
        Ok(self.push_version(filename, by, description))
    }

    /// Produce a print-optimized copy (300 DPI, CMYK) as a new version.
    pub fn optimize_for_print(&mut self, by: Uuid) -> Result<FileVersion> {
        if self.status != FileStatus::Ready {
            return Err(Error::InvalidState(format!(
                "file must be ready before optimization, status is {}",
                self.status.as_str()
            )));
        }
        let filename = self.filename.clone();
        Ok(self.push_version(filename, by, "optimized for print".into()))
    }

    fn push_version(&mut self, filename: String, by: Uuid, description: String) -> FileVersion {
        let version = FileVersion {
            number: self.versions.len() as u32 + 1,
            filename,
            created_by: by,
            description,
            created_at: Utc::now(),
        };
        self.versions.push(version.clone());
        self.touch();
        version
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PNG: signature + IHDR (100x80, truecolor) + pHYs at 11811
    /// pixels/metre (300 DPI) + IEND.
    fn png_fixture() -> Vec<u8> {
        let mut b = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        b.extend_from_slice(&13u32.to_be_bytes());
        b.extend_from_slice(b"IHDR");
        b.extend_from_slice(&100u32.to_be_bytes());
        b.extend_from_slice(&80u32.to_be_bytes());
        b.push(8); // bit depth
        b.push(2); // color type: truecolor
        b.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
        b.extend_from_slice(&[0; 4]); // crc, unchecked
        b.extend_from_slice(&9u32.to_be_bytes());
        b.extend_from_slice(b"pHYs");
        b.extend_from_slice(&11_811u32.to_be_bytes());
        b.extend_from_slice(&11_811u32.to_be_bytes());
        b.push(1); // unit: metre
        b.extend_from_slice(&[0; 4]); // crc
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(b"IEND");
        b.extend_from_slice(&[0; 4]);
        b
    }

    /// Minimal JPEG: SOI + JFIF APP0 at 150 DPI + SOF0 640x480, 3 channels.
    fn jpeg_fixture() -> Vec<u8> {
        let mut b = vec![0xFF, 0xD8];
        b.extend_from_slice(&[0xFF, 0xE0]);
        b.extend_from_slice(&16u16.to_be_bytes());
        b.extend_from_slice(b"JFIF\0");
        b.extend_from_slice(&[1, 2]); // version
        b.push(1); // units: dpi
        b.extend_from_slice(&150u16.to_be_bytes());
        b.extend_from_slice(&150u16.to_be_bytes());
        b.extend_from_slice(&[0, 0]); // thumbnail
        b.extend_from_slice(&[0xFF, 0xC0]);
        b.extend_from_slice(&17u16.to_be_bytes());
        b.push(8); // precision
        b.extend_from_slice(&480u16.to_be_bytes());
        b.extend_from_slice(&640u16.to_be_bytes());
        b.push(3); // components
        b.extend_from_slice(&[1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        b
    }

    #[test]
    fn detects_formats_from_magic_bytes() {
        assert_eq!(FileFormat::detect(&png_fixture()), Some(FileFormat::Png));
        assert_eq!(FileFormat::detect(&jpeg_fixture()), Some(FileFormat::Jpeg));
        assert_eq!(FileFormat::detect(b"%PDF-1.7\n"), Some(FileFormat::Pdf));
        assert_eq!(FileFormat::detect(b"II*\0rest"), Some(FileFormat::Tiff));
        assert_eq!(FileFormat::detect(b"plain text"), None);
    }

    #[test]
    fn parses_png_header() {
        let meta = extract_metadata(&png_fixture()).unwrap();
        assert_eq!(meta.width, 100);
        assert_eq!(meta.height, 80);
        assert_eq!(meta.dpi, Some(300));
        assert_eq!(meta.color_mode, Some(ColorMode::Rgb));
    }

    #[test]
    fn parses_jpeg_header() {
        let meta = extract_metadata(&jpeg_fixture()).unwrap();
        assert_eq!(meta.width, 640);
        assert_eq!(meta.height, 480);
        assert_eq!(meta.dpi, Some(150));
        assert_eq!(meta.color_mode, Some(ColorMode::Rgb));
    }

    #[test]
    fn quality_tier_thresholds() {
        assert_eq!(QualityTier::from_dpi(300), QualityTier::PrintReady);
        assert_eq!(QualityTier::from_dpi(299), QualityTier::High);
        assert_eq!(QualityTier::from_dpi(150), QualityTier::High);
        assert_eq!(QualityTier::from_dpi(149), QualityTier::Medium);
        assert_eq!(QualityTier::from_dpi(72), QualityTier::Medium);
        assert_eq!(QualityTier::from_dpi(71), QualityTier::Low);
    }

    #[test]
    fn unsupported_extension_is_a_hard_error() {
        let file = PrintFile::new(Uuid::new_v4(), "artwork.docx", 1_024);
        let validation = file.validate();
        assert!(!validation.valid);
        assert!(validation.issues.iter().any(|i| i.kind == IssueKind::Error));
    }

    #[test]
    fn low_resolution_is_a_warning_not_an_error() {
        let mut file = PrintFile::new(Uuid::new_v4(), "artwork.png", 1_024);
        file.apply_inspection(
            FileFormat::Png,
            Some(ImageMetadata {
                format: FileFormat::Png,
                width: 400,
                height: 300,
                dpi: Some(96),
                color_mode: Some(ColorMode::Rgb),
            }),
        );
        let validation = file.validate();
        assert!(validation.valid);
        assert!(validation.issues.iter().any(|i| i.kind == IssueKind::Warning));
        assert!(!validation.recommendations.is_empty());
    }

    #[test]
    fn conversion_creates_a_new_version() {
        let owner = Uuid::new_v4();
        let mut file = PrintFile::new(owner, "artwork.png", 1_024);
        file.apply_inspection(FileFormat::Png, None);
        let editor = Uuid::new_v4();
        let version = file.convert_to(FileFormat::Pdf, editor).unwrap();
        assert_eq!(version.number, 2);
        assert_eq!(version.filename, "artwork.pdf");
        assert_eq!(version.created_by, editor);
        // the original record is untouched
        assert_eq!(file.filename, "artwork.png");
        assert_eq!(file.versions[0].filename, "artwork.png");
    }

    #[test]
    fn conversion_requires_a_ready_file() {
        let mut file = PrintFile::new(Uuid::new_v4(), "artwork.png", 1_024);
        let err = file.convert_to(FileFormat::Pdf, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidState(_)));
    }

    #[test]
    fn versions_are_sequential() {
        let owner = Uuid::new_v4();
        let mut file = PrintFile::new(owner, "artwork.jpg", 2_048);
        file.apply_inspection(FileFormat::Jpeg, None);
        file.convert_to(FileFormat::Pdf, owner).unwrap();
        file.optimize_for_print(owner).unwrap();
        let numbers: Vec<u32> = file.versions.iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
