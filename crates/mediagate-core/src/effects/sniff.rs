//! Magic-byte signature sniffing.
//!
//! Video containers are matched here; still images are delegated to
//! `image::guess_format` and audio to lofty's `FileType::from_buffer`.
//! Containers go first because WebP/AVI and AVIF/MP4 share outer headers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::ImageFormat;
use lofty::file::FileType;

use crate::error::ProbeError;

use super::{Signature, SignatureSniffer};

/// How much of a file callers should hand to [`SignatureSniffer::sniff`].
pub const HEAD_LEN: u64 = 64 * 1024;

/// Read at most `limit` leading bytes of `path`.
pub fn read_head(path: &Path, limit: u64) -> Result<Vec<u8>, ProbeError> {
    let io_err = |source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut buffer = Vec::new();
    File::open(path)
        .map_err(io_err)?
        .take(limit)
        .read_to_end(&mut buffer)
        .map_err(io_err)?;
    Ok(buffer)
}

/// Default sniffer covering the upload formats placements ask for.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MagicSniffer {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureSniffer for MagicSniffer {
    fn sniff(&self, buffer: &[u8]) -> Option<Signature> {
        sniff_container(buffer)
            .or_else(|| sniff_image(buffer))
            .or_else(|| sniff_audio(buffer))
    }
}

fn sniff_container(buf: &[u8]) -> Option<Signature> {
    if buf.len() >= 12 && &buf[4..8] == b"ftyp" {
        return Some(iso_bmff_brand(&buf[8..12]));
    }
    if buf.len() >= 8 && &buf[4..8] == b"moov" {
        return Some(Signature::new("mov", "video/quicktime"));
    }
    if buf.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        let head = &buf[..buf.len().min(64)];
        return Some(if head.windows(4).any(|w| w == b"webm") {
            Signature::new("webm", "video/webm")
        } else {
            Signature::new("mkv", "video/x-matroska")
        });
    }
    if buf.len() >= 12 && buf.starts_with(b"RIFF") && &buf[8..12] == b"AVI " {
        return Some(Signature::new("avi", "video/vnd.avi"));
    }
    if buf.starts_with(b"FLV\x01") {
        return Some(Signature::new("flv", "video/x-flv"));
    }
    if buf.starts_with(&[0x00, 0x00, 0x01, 0xBA]) {
        return Some(Signature::new("mpg", "video/mpeg"));
    }
    if buf.len() > 188 && buf[0] == 0x47 && buf[188] == 0x47 {
        return Some(Signature::new("mts", "video/mp2t"));
    }
    None
}

/// ISO base media file: the major brand decides what the container holds.
fn iso_bmff_brand(brand: &[u8]) -> Signature {
    match brand {
        b"qt  " => Signature::new("mov", "video/quicktime"),
        b"M4A " | b"M4B " | b"M4P " => Signature::new("m4a", "audio/x-m4a"),
        b"M4V " | b"M4VH" | b"M4VP" => Signature::new("m4v", "video/x-m4v"),
        b"avif" | b"avis" => Signature::new("avif", "image/avif"),
        b"heic" | b"heix" | b"mif1" | b"msf1" => Signature::new("heic", "image/heic"),
        b if b.starts_with(b"3g2") => Signature::new("3g2", "video/3gpp2"),
        b if b.starts_with(b"3gp") => Signature::new("3gp", "video/3gpp"),
        _ => Signature::new("mp4", "video/mp4"),
    }
}

fn sniff_image(buf: &[u8]) -> Option<Signature> {
    let format = image::guess_format(buf).ok()?;
    let extension = match format {
        ImageFormat::Jpeg => "jpg",
        other => other.extensions_str().first().copied()?,
    };
    Some(Signature::new(extension, format.to_mime_type()))
}

fn sniff_audio(buf: &[u8]) -> Option<Signature> {
    if let Some(tag_len) = id3v2_len(buf) {
        // An ID3v2 tag with nothing recognizable after it is almost always MP3.
        return match buf.get(tag_len..) {
            Some(rest) if !rest.is_empty() => {
                sniff_audio(rest).or_else(|| Some(Signature::new("mp3", "audio/mpeg")))
            }
            _ => Some(Signature::new("mp3", "audio/mpeg")),
        };
    }

    let signature = match FileType::from_buffer(buf)? {
        FileType::Mpeg => Signature::new("mp3", "audio/mpeg"),
        FileType::Aac => Signature::new("aac", "audio/aac"),
        FileType::Flac => Signature::new("flac", "audio/x-flac"),
        FileType::Wav => Signature::new("wav", "audio/vnd.wave"),
        FileType::Aiff => Signature::new("aif", "audio/aiff"),
        FileType::Vorbis | FileType::Speex => Signature::new("ogg", "audio/ogg"),
        FileType::Opus => Signature::new("opus", "audio/opus"),
        FileType::Ape => Signature::new("ape", "audio/ape"),
        FileType::WavPack => Signature::new("wv", "audio/wavpack"),
        FileType::Mpc => Signature::new("mpc", "audio/x-musepack"),
        FileType::Mp4 => Signature::new("m4a", "audio/x-m4a"),
        _ => return None,
    };
    Some(signature)
}

/// Total length of a leading ID3v2 tag (header, body and optional footer).
fn id3v2_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 10 || !buf.starts_with(b"ID3") {
        return None;
    }
    let size = buf[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
    let footer = if buf[5] & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(buf: &[u8]) -> Option<String> {
        MagicSniffer::new().sniff(buf).map(|s| s.mime_type)
    }

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut buf = vec![0x00, 0x00, 0x00, 0x20];
        buf.extend_from_slice(b"ftyp");
        buf.extend_from_slice(brand);
        buf.extend_from_slice(&[0u8; 20]);
        buf
    }

    #[test]
    fn iso_bmff_brands() {
        assert_eq!(sniff(&ftyp(b"isom")).as_deref(), Some("video/mp4"));
        assert_eq!(sniff(&ftyp(b"mp42")).as_deref(), Some("video/mp4"));
        assert_eq!(sniff(&ftyp(b"qt  ")).as_deref(), Some("video/quicktime"));
        assert_eq!(sniff(&ftyp(b"M4A ")).as_deref(), Some("audio/x-m4a"));
        assert_eq!(sniff(&ftyp(b"3gp5")).as_deref(), Some("video/3gpp"));
    }

    #[test]
    fn matroska_vs_webm() {
        let mut webm = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x82, 0x84];
        webm.extend_from_slice(b"webm");
        assert_eq!(sniff(&webm).as_deref(), Some("video/webm"));

        let mut mkv = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x82, 0x88];
        mkv.extend_from_slice(b"matroska");
        assert_eq!(sniff(&mkv).as_deref(), Some("video/x-matroska"));
    }

    #[test]
    fn riff_avi_is_not_audio() {
        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&[0x10, 0, 0, 0]);
        avi.extend_from_slice(b"AVI LIST");
        assert_eq!(sniff(&avi).as_deref(), Some("video/vnd.avi"));
    }

    #[test]
    fn png_and_jpeg() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        let sig = MagicSniffer::new().sniff(&png).unwrap();
        assert_eq!(sig.mime_type, "image/png");
        assert_eq!(sig.extension, "png");

        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        let sig = MagicSniffer::new().sniff(&jpeg).unwrap();
        assert_eq!(sig.mime_type, "image/jpeg");
        assert_eq!(sig.extension, "jpg");
    }

    #[test]
    fn id3_tagged_mp3() {
        let mut mp3 = b"ID3".to_vec();
        mp3.extend_from_slice(&[0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        // MPEG-1 Layer III frame header after the (empty) tag
        mp3.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        mp3.extend_from_slice(&[0u8; 64]);
        assert_eq!(sniff(&mp3).as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn id3_tag_longer_than_buffer_is_mp3() {
        let mut mp3 = b"ID3".to_vec();
        mp3.extend_from_slice(&[0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]);
        mp3.extend_from_slice(&[0u8; 32]);
        assert_eq!(sniff(&mp3).as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn id3v2_length_is_syncsafe() {
        let header = [b'I', b'D', b'3', 4, 0, 0x10, 0x00, 0x00, 0x02, 0x01];
        assert_eq!(id3v2_len(&header), Some(10 + 257 + 10));
    }

    #[test]
    fn read_head_is_bounded() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(&[7u8; 1000]).expect("write");
        assert_eq!(read_head(file.path(), 16).unwrap().len(), 16);
        assert_eq!(read_head(file.path(), HEAD_LEN).unwrap().len(), 1000);
        assert!(read_head(Path::new("/nonexistent/mediagate"), 16).is_err());
    }

    #[test]
    fn unknown_bytes() {
        assert_eq!(sniff(b"hello, world"), None);
        assert_eq!(sniff(&[]), None);
    }
}
