//! Wire protocol: envelope codec, origin guard, typed commands and events.

pub mod envelope;
pub mod messages;
pub mod origin;

pub use envelope::{
    decode_envelope, decode_envelope_value, encode_envelope, Envelope, EnvelopeError,
    PROTOCOL_VERSION,
};
pub use messages::{CommandKind, HostCommand, PayloadError, WidgetEvent};
pub use origin::{OriginGuard, TrustedOrigin, WILDCARD_ORIGIN};
