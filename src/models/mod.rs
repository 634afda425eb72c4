pub mod job;
pub mod ocr;
pub mod response;
pub mod tts;
