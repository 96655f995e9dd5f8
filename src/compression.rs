use crate::error::{Result, WatermarkError};
use crate::pdf::{Dictionary, PdfObject};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn decompress_deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| WatermarkError::malformed(format!("FlateDecode failed: {}", e)))?;
    Ok(out)
}

pub fn compress_deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decode stream data according to the `/Filter` entry of its dictionary.
///
/// Only FlateDecode without predictors is handled; that covers object streams
/// written by common producers.
pub fn decode_stream(dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None => Vec::new(),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(items)) => items.iter().filter_map(|i| i.as_name()).collect(),
        Some(other) => {
            return Err(WatermarkError::malformed(format!("invalid /Filter value {:?}", other)));
        }
    };

    if let Some(predictor) = dict
        .get("DecodeParms")
        .and_then(|p| p.as_dict())
        .and_then(|p| p.get("Predictor"))
        .and_then(|p| p.as_i64())
    {
        if predictor > 1 {
            return Err(WatermarkError::Unsupported(format!("stream predictor {}", predictor)));
        }
    }

    let mut decoded = data.to_vec();
    for filter in filters {
        decoded = match filter {
            "FlateDecode" | "Fl" => decompress_deflate(&decoded)?,
            other => return Err(WatermarkError::Unsupported(format!("stream filter /{}", other))),
        };
    }
    Ok(decoded)
}

pub fn decode_hex_string(hex_str: &str) -> Result<Vec<u8>> {
    let mut digits: Vec<u8> = hex_str
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    // An odd trailing digit is padded with 0
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }

    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(s, 16)
                .map_err(|_| WatermarkError::malformed(format!("invalid hex string: {}", s)))
        })
        .collect()
}

pub fn encode_hex_string(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{:02X}", byte)).collect()
}
