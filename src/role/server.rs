use super::RoleHelper;
use crate::frame::Mask;

/// Standard server.
#[derive(Debug, Clone, Copy)]
pub struct Server;

impl RoleHelper for Server {
    /// Server should not mask the payload.
    #[inline]
    fn new_write_mask() -> Mask { Mask::None }
}
