/// Element types for receive buffers whose storage is aligned for `f64`.
///
/// Numeric payloads are reinterpreted in place, so the buffer a frame is read
/// into must be at least as aligned as the values it carries.
pub trait Align8: bytemuck::Pod {}

impl Align8 for u64 {}
impl Align8 for i64 {}
impl Align8 for u128 {}
impl Align8 for i128 {}
impl Align8 for f64 {}
