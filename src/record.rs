//! Record declarations
//!
//! [`record!`](crate::record) declares a struct and implements
//! [`Marshal`](crate::Marshal) / [`Unmarshal`](crate::Unmarshal) for it.
//! Only fields declared plain `pub` take part in marshaling; private and
//! `pub(...)`-restricted fields are skipped and need not implement either
//! trait.
//!
//! ```rust
//! use arrayvault::record;
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Sample {
//!         pub id: i64,
//!         pub values: Vec<f64>,
//!         cache: String,
//!     }
//! }
//! ```

/// Declare a record type whose exported fields are marshaled in order
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($body)*
        }

        $crate::__record_fields!(@scan $name [] $($body)*);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_fields {
    // exported field
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* pub $field:ident : $ty:ty, $($rest:tt)*) => {
        $crate::__record_fields!(@scan $name [$($seen)* $field] $($rest)*);
    };
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* pub $field:ident : $ty:ty) => {
        $crate::__record_fields!(@scan $name [$($seen)* $field]);
    };

    // restricted visibility, skipped
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* pub ($($r:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        $crate::__record_fields!(@scan $name [$($seen)*] $($rest)*);
    };
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* pub ($($r:tt)*) $field:ident : $ty:ty) => {
        $crate::__record_fields!(@scan $name [$($seen)*]);
    };

    // private field, skipped
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* $field:ident : $ty:ty, $($rest:tt)*) => {
        $crate::__record_fields!(@scan $name [$($seen)*] $($rest)*);
    };
    (@scan $name:ident [$($seen:ident)*] $(#[$m:meta])* $field:ident : $ty:ty) => {
        $crate::__record_fields!(@scan $name [$($seen)*]);
    };

    (@scan $name:ident [$($seen:ident)*]) => {
        impl $crate::Marshal for $name {
            fn view(&self) -> $crate::View<'_> {
                $crate::View::Record(::std::vec![
                    $( (::std::stringify!($seen), $crate::Marshal::view(&self.$seen)) ),*
                ])
            }
        }

        impl $crate::Unmarshal for $name {
            fn target(&mut self) -> $crate::Target<'_> {
                $crate::Target::Record(::std::vec![
                    $( (::std::stringify!($seen), $crate::Unmarshal::target(&mut self.$seen)) ),*
                ])
            }
        }
    };
}
