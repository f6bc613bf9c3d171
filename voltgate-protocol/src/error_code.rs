//! Standard OCPP-J error codes for `CallError` frames.

pub const NOT_IMPLEMENTED: &str = "NotImplemented";
pub const NOT_SUPPORTED: &str = "NotSupported";
pub const INTERNAL_ERROR: &str = "InternalError";
pub const PROTOCOL_ERROR: &str = "ProtocolError";
pub const SECURITY_ERROR: &str = "SecurityError";
pub const FORMATION_VIOLATION: &str = "FormationViolation";
pub const PROPERTY_CONSTRAINT_VIOLATION: &str = "PropertyConstraintViolation";
pub const OCCURRENCE_CONSTRAINT_VIOLATION: &str = "OccurrenceConstraintViolation";
pub const TYPE_CONSTRAINT_VIOLATION: &str = "TypeConstraintViolation";
pub const GENERIC_ERROR: &str = "GenericError";
