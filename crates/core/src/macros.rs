// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the workspace.
//!
//! - [`simple_display!`]: `Display` for enums whose variants print as fixed strings
//! - [`setters!`]: chainable setters for config-style structs

/// Implement `Display` by mapping each variant to a string literal.
///
/// Data-carrying variants are matched with `(..)` or `{ .. }`.
///
/// ```ignore
/// gc_core::simple_display! {
///     Isolation {
///         None => "none",
///         Worktree => "worktree",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($tuple:tt)* ))? $({ $($named:tt)* })? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($tuple)* ))? $({ $($named)* })? => $str, )+
                })
            }
        }
    };
}

/// Generate chainable setters inside an existing `impl` block.
///
/// - `into { field: Type }` takes `impl Into<Type>`
/// - `set { field: Type }` takes `Type`
/// - `option { field: Type }` stores `Some(v.into())` into an `Option<Type>` field
///
/// ```ignore
/// impl AgentSpec {
///     gc_core::setters! {
///         into { command: String }
///         set { suspended: bool }
///         option { rig: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into {
            $( $into_field:ident : $into_ty:ty ),* $(,)?
        })?
        $(set {
            $( $set_field:ident : $set_ty:ty ),* $(,)?
        })?
        $(option {
            $( $opt_field:ident : $opt_ty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                self.$into_field = v.into();
                self
            }
        )*)?

        $($(
            pub fn $set_field(mut self, v: $set_ty) -> Self {
                self.$set_field = v;
                self
            }
        )*)?

        $($(
            pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                self.$opt_field = Some(v.into());
                self
            }
        )*)?
    };
}
