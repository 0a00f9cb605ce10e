use super::RoleHelper;
use crate::frame::{Mask, mask};

/// Standard client using a fresh random mask key for every frame.
#[derive(Debug, Clone, Copy)]
pub struct Client;

impl RoleHelper for Client {
    #[inline]
    fn new_write_mask() -> Mask { Mask::Key(mask::new_rand_key()) }
}
