// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF text and embedded-image extraction
//!
//! Both functions are synchronous and CPU-bound; callers run them on the
//! blocking pool.

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::{Cursor, Read};
use std::panic;
use tracing::debug;

use super::errors::ExtractionError;

/// Extract the text layer of every page
///
/// The text extractor panics on some malformed or image-only documents;
/// that is reported as an ordinary [`ExtractionError::Pdf`].
pub fn extract_embedded_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| ExtractionError::Pdf(e.to_string())),
        Err(_) => Err(ExtractionError::Pdf(
            "text extractor aborted on this document".to_string(),
        )),
    }
}

/// Collect every image XObject that OCR can read, as an encoded image file
///
/// - DCT streams are complete JPEG files and pass through untouched
/// - 8-bit DeviceRGB / DeviceGray rasters, Flate-compressed or unfiltered,
///   are rebuilt and re-encoded as PNG
/// - anything else (JBIG2, CCITT, indexed or ICC colour, predictors) is skipped
pub fn embedded_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let images = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_image(&stream.dict) => {
                let encoded = encode_for_ocr(&doc, stream);
                if encoded.is_none() {
                    debug!("Skipping PDF image {:?}: unsupported encoding", id);
                }
                encoded
            }
            _ => None,
        })
        .collect();

    Ok(images)
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

fn filter_names(dict: &Dictionary) -> Vec<&[u8]> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(filters)) => filters.iter().filter_map(|f| f.as_name().ok()).collect(),
        _ => Vec::new(),
    }
}

fn encode_for_ocr(doc: &Document, stream: &Stream) -> Option<Vec<u8>> {
    let filters = filter_names(&stream.dict);

    let pixels = match filters.as_slice() {
        [name] if *name == b"DCTDecode" => return Some(stream.content.clone()),
        [] => stream.content.clone(),
        [name] if *name == b"FlateDecode" => {
            if has_predictor(&stream.dict) {
                return None;
            }
            inflate(&stream.content)?
        }
        _ => return None,
    };

    raster_to_png(doc, &stream.dict, pixels)
}

fn has_predictor(dict: &Dictionary) -> bool {
    dict.get(b"DecodeParms")
        .and_then(Object::as_dict)
        .and_then(|params| params.get(b"Predictor"))
        .and_then(Object::as_i64)
        .map(|predictor| predictor > 1)
        .unwrap_or(false)
}

fn inflate(content: &[u8]) -> Option<Vec<u8>> {
    let mut output = Vec::with_capacity(content.len() * 4);
    ZlibDecoder::new(content).read_to_end(&mut output).ok()?;
    Some(output)
}

fn raster_to_png(doc: &Document, dict: &Dictionary, pixels: Vec<u8>) -> Option<Vec<u8>> {
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;

    if dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok()? != 8 {
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|object| resolve_name(doc, object))?;

    let image = if color_space == b"DeviceRGB" {
        DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels)?)
    } else if color_space == b"DeviceGray" {
        DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels)?)
    } else {
        return None;
    };

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .ok()?;
    Some(png)
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

fn resolve_name<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a [u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_name().ok(),
        _ => None,
    }
}
