#![allow(dead_code)]

#[path = "../../src/document/fixtures.rs"]
mod fixtures;

pub use fixtures::pdf_bytes;

/// Encode a single-file multipart body and return it with its content type.
pub fn multipart_upload(field_name: &str, file_name: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "pdfchat-integration-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
