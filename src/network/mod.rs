//! Network Layer
//!
//! HTTP surface of the game: query parsing, JSON responses, the static
//! web client, and the server loop. All game rules live in `game/`.

pub mod protocol;
pub mod server;
pub mod static_files;

pub use protocol::{
    action_status, error_response, json_response, parse_request, ApiRequest, ErrorBody,
    HttpResponse, RequestError,
};
pub use server::{unix_now, GameServer, GameServerError, RequestHandler, ServerConfig};
pub use static_files::serve_file;
