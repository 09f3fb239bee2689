//! The request pipeline every endpoint is built from: body decoding,
//! required-field checks, sanitization, loose coercion, the POST action
//! discriminator and the response envelope.

pub mod action;
pub mod coerce;
pub mod envelope;
pub mod payload;
pub mod sanitize;

pub use action::{parse_action, resolve_action, target_id, ActionQuery, AuthAction, HabitAction, WriteAction};
pub use envelope::ApiResponse;
pub use payload::{parse, JsonBody, MaybeJsonBody, Params, Payload, Schema};
