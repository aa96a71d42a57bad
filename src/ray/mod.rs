//! This module holds the [`Ray`] and [`RayK`] packet definitions.
mod packet;
mod ray_impl;

pub use self::packet::*;
pub use self::ray_impl::*;
