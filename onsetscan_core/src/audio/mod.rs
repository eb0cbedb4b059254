pub mod decoder;
pub mod mel;
pub mod onset;
pub mod peaks;
pub mod stft;
pub mod transcode;
