use component_macros::interceptable;
use sprig_common::InvocationError;

#[interceptable]
trait Clock: Send + Sync {
    fn tick(&self) -> Result<(), InvocationError>;
}

fn main() {}
