use encoding_rs::Encoding;

/// Resolves a configured encoding label such as `shift_jis` or `windows-1252`.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Decodes log bytes: BOM first, then UTF-8, then the fallback, then lossy UTF-8.
pub fn decode_log_bytes(bytes: &[u8], fallback: Option<&'static Encoding>) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
        tracing::trace!(
            target: "egrun.classify",
            encoding = enc.name(),
            bytes = bytes.len(),
            "decoding log with BOM"
        );
        let (cow, _) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        return cow.into_owned();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    if let Some(enc) = fallback {
        let (cow, had_err) = enc.decode_without_bom_handling(bytes);
        if !had_err {
            tracing::trace!(
                target: "egrun.classify",
                encoding = enc.name(),
                bytes = bytes.len(),
                "decoding log with fallback encoding"
            );
            return cow.into_owned();
        }
    }

    tracing::debug!(target: "egrun.classify", bytes = bytes.len(), "using lossy UTF-8 conversion");
    String::from_utf8_lossy(bytes).into_owned()
}
