//! HTTP/1.x message handling shared by both services.
//!
//! # Data Flow
//! ```text
//! raw bytes from socket
//!     → codec.rs (request line, header lines, header map)
//!     → [proxy engine | origin handler]
//!     → response.rs (status line + headers + optional body)
//!     → raw bytes to socket
//! ```
//!
//! # Design Decisions
//! - Parsing is lossy (invalid UTF-8 is replaced), never rejects on encoding
//! - Only the request line is validated; header lines are best effort
//! - No chunked encoding, no keep-alive: every exchange ends with a close

pub mod codec;
pub mod response;

pub use codec::{
    find_header_end, parse_response_head, CodecError, Headers, Request, ResponseHead,
    HEADER_TERMINATOR,
};
pub use response::{Response, StatusCode};
