//! Value capabilities
//!
//! Native values describe themselves to the engine through two traits:
//!
//! - [`Marshal`] (write path) yields a [`View`]: a scalar, a sequence, a
//!   fixed-length array or a record of named fields, with the value's bytes
//!   borrowed whenever the value is already laid out as plain numbers.
//! - [`Unmarshal`] (read path) yields a [`Target`]: mutable access to the
//!   destination storage, including the ability to reallocate sequences.
//!
//! Implementations are provided for every supported numeric type, `Vec<T>`,
//! `[T]`, `[T; N]`, common smart pointers, and records declared with
//! [`record!`](crate::record). `bool` and `char` describe themselves with
//! kinds that have no stored representation so that they are rejected with
//! `UnsupportedType`.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use bytemuck::Pod;

use crate::error::{MarshalError, Result};
use crate::types::Kind;

/// Named fields of a record view, in declaration order
pub type FieldViews<'v> = Vec<(&'static str, View<'v>)>;

/// Named fields of a record target, in declaration order
pub type FieldTargets<'v> = Vec<(&'static str, Target<'v>)>;

/// Write-side shape of a value
#[derive(Debug)]
pub enum View<'v> {
    Scalar {
        kind: Kind,
        bytes: Cow<'v, [u8]>,
    },
    /// Variable-length homogeneous sequence
    Sequence {
        kind: Kind,
        len: usize,
        bytes: Cow<'v, [u8]>,
    },
    /// Homogeneous sequence whose length is part of its type
    Array {
        kind: Kind,
        len: usize,
        bytes: Cow<'v, [u8]>,
    },
    Record(FieldViews<'v>),
}

impl View<'_> {
    /// Short human-readable shape name
    pub fn shape(&self) -> &'static str {
        match self {
            View::Scalar { .. } => "scalar",
            View::Sequence { .. } => "sequence",
            View::Array { .. } => "array",
            View::Record(_) => "record",
        }
    }
}

/// Read-side access to destination storage
pub enum Target<'v> {
    Scalar(&'v mut dyn ScalarSlot),
    Sequence(&'v mut dyn SequenceSlot),
    /// Fixed-length destination; `bytes` spans exactly `len` elements
    Array {
        kind: Kind,
        len: usize,
        bytes: &'v mut [u8],
    },
    Record(FieldTargets<'v>),
    /// Destination is shared and cannot be written through
    Shared,
}

impl Target<'_> {
    /// Human-readable expectation used in type mismatch errors
    pub fn expectation(&self) -> String {
        match self {
            Target::Scalar(slot) => format!("scalar of {:?}", slot.kind()),
            Target::Sequence(slot) => format!("sequence of {:?}", slot.kind()),
            Target::Array { kind, len, .. } => format!("array of {} {:?}", len, kind),
            Target::Record(_) => "record".to_string(),
            Target::Shared => "addressable destination".to_string(),
        }
    }
}

/// Describe a value for the write path
pub trait Marshal {
    fn view(&self) -> View<'_>;
}

/// Expose destination storage for the read path
pub trait Unmarshal {
    fn target(&mut self) -> Target<'_>;
}

/// A single destination value
pub trait ScalarSlot {
    fn kind(&self) -> Kind;

    /// Overwrite from exactly one element's worth of bytes
    fn load(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A resizable destination sequence
pub trait SequenceSlot {
    fn kind(&self) -> Kind;

    /// Swap in freshly allocated storage of `len` zeroed elements and return
    /// it as bytes. Previous contents are discarded.
    fn reallocate(&mut self, len: usize) -> Result<&mut [u8]>;
}

/// Plain numeric types with a stored representation
pub trait Scalar: Pod {
    const KIND: Kind;
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: Kind = Kind::$kind;
            }

            impl Marshal for $ty {
                fn view(&self) -> View<'_> {
                    View::Scalar {
                        kind: Kind::$kind,
                        bytes: Cow::Borrowed(bytemuck::bytes_of(self)),
                    }
                }
            }

            impl Unmarshal for $ty {
                fn target(&mut self) -> Target<'_> {
                    Target::Scalar(self)
                }
            }

            impl ScalarSlot for $ty {
                fn kind(&self) -> Kind {
                    Kind::$kind
                }

                fn load(&mut self, bytes: &[u8]) -> Result<()> {
                    if bytes.len() != std::mem::size_of::<$ty>() {
                        return Err(MarshalError::DimensionMismatch(format!(
                            "expected {} bytes for {:?}, got {}",
                            std::mem::size_of::<$ty>(),
                            Kind::$kind,
                            bytes.len()
                        )));
                    }
                    *self = bytemuck::pod_read_unaligned(bytes);
                    Ok(())
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    isize => Int,
    usize => Uint,
    f32 => Float32,
    f64 => Float64,
}

// =============================================================================
// Kinds Without a Stored Representation
// =============================================================================

impl Marshal for bool {
    fn view(&self) -> View<'_> {
        View::Scalar {
            kind: Kind::Bool,
            bytes: Cow::Owned(vec![u8::from(*self)]),
        }
    }
}

impl Unmarshal for bool {
    fn target(&mut self) -> Target<'_> {
        Target::Scalar(self)
    }
}

impl ScalarSlot for bool {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn load(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(MarshalError::UnsupportedType(Kind::Bool))
    }
}

impl Marshal for char {
    fn view(&self) -> View<'_> {
        View::Scalar {
            kind: Kind::Char,
            bytes: Cow::Owned(u32::from(*self).to_ne_bytes().to_vec()),
        }
    }
}

impl Unmarshal for char {
    fn target(&mut self) -> Target<'_> {
        Target::Scalar(self)
    }
}

impl ScalarSlot for char {
    fn kind(&self) -> Kind {
        Kind::Char
    }

    fn load(&mut self, _bytes: &[u8]) -> Result<()> {
        Err(MarshalError::UnsupportedType(Kind::Char))
    }
}

// =============================================================================
// Sequences and Arrays
// =============================================================================

impl<T: Scalar> Marshal for Vec<T> {
    fn view(&self) -> View<'_> {
        self.as_slice().view()
    }
}

impl<T: Scalar> Marshal for [T] {
    fn view(&self) -> View<'_> {
        View::Sequence {
            kind: T::KIND,
            len: self.len(),
            bytes: Cow::Borrowed(bytemuck::cast_slice(self)),
        }
    }
}

impl<T: Scalar, const N: usize> Marshal for [T; N] {
    fn view(&self) -> View<'_> {
        View::Array {
            kind: T::KIND,
            len: N,
            bytes: Cow::Borrowed(bytemuck::cast_slice(self.as_slice())),
        }
    }
}

impl<T: Scalar> Unmarshal for Vec<T> {
    fn target(&mut self) -> Target<'_> {
        Target::Sequence(self)
    }
}

impl<T: Scalar> SequenceSlot for Vec<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }

    fn reallocate(&mut self, len: usize) -> Result<&mut [u8]> {
        let mut fresh: Vec<T> = Vec::new();
        fresh.try_reserve_exact(len).map_err(|e| {
            MarshalError::AllocationFailure(format!("{} elements of {:?}: {}", len, T::KIND, e))
        })?;
        fresh.resize(len, T::zeroed());

        drop(std::mem::replace(self, fresh));

        Ok(bytemuck::cast_slice_mut(self.as_mut_slice()))
    }
}

impl<T: Scalar> Unmarshal for [T] {
    fn target(&mut self) -> Target<'_> {
        Target::Array {
            kind: T::KIND,
            len: self.len(),
            bytes: bytemuck::cast_slice_mut(self),
        }
    }
}

impl<T: Scalar, const N: usize> Unmarshal for [T; N] {
    fn target(&mut self) -> Target<'_> {
        self.as_mut_slice().target()
    }
}

// =============================================================================
// Pointers
// =============================================================================

impl<T: Marshal + ?Sized> Marshal for &T {
    fn view(&self) -> View<'_> {
        (**self).view()
    }
}

impl<T: Marshal + ?Sized> Marshal for Box<T> {
    fn view(&self) -> View<'_> {
        self.as_ref().view()
    }
}

impl<T: Marshal + ?Sized> Marshal for Rc<T> {
    fn view(&self) -> View<'_> {
        self.as_ref().view()
    }
}

impl<T: Marshal + ?Sized> Marshal for Arc<T> {
    fn view(&self) -> View<'_> {
        self.as_ref().view()
    }
}

impl<T: Unmarshal + ?Sized> Unmarshal for Box<T> {
    fn target(&mut self) -> Target<'_> {
        self.as_mut().target()
    }
}

impl<T: Unmarshal + ?Sized> Unmarshal for Rc<T> {
    fn target(&mut self) -> Target<'_> {
        match Rc::get_mut(self) {
            Some(inner) => inner.target(),
            None => Target::Shared,
        }
    }
}

impl<T: Unmarshal + ?Sized> Unmarshal for Arc<T> {
    fn target(&mut self) -> Target<'_> {
        match Arc::get_mut(self) {
            Some(inner) => inner.target(),
            None => Target::Shared,
        }
    }
}
