pub mod event;
pub mod ip_set;

pub use event::{
    DetectionEvent, FindingAction, FindingDetail, FindingService, NetworkConnectionAction,
    RemoteIpDetails,
};
pub use ip_set::{
    BlockOutcome, InvocationResult, IpSetHandle, IpSetPage, IpSetSnapshot, IpSetSummary,
    ParseScopeError, Scope,
};
