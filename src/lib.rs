//! SICO, a single instruction computer.
//!
//! Every instruction is three words `A B C` meaning
//! "subtract `mem[B]` from `mem[A]`, and jump to `C` if the result would be
//! non-positive". Arithmetic is unsigned and wraps at a configurable modulus.
//! Programs are written in a small assembly language (see [`assembler`]) and
//! talk to the outside world through ports at the top of the address space
//! (see [`port`]).
//!
//! ```
//! use sico::host::BufferHost;
//! use sico::vm::{State, Vm, UNBOUNDED};
//!
//! let mut vm = Vm::new();
//! vm.assemble("0-2 char ?+1 0-1 0 0 char: 'x");
//! let mut host = BufferHost::new();
//! assert_eq!(vm.run(&mut host, UNBOUNDED), State::Completed);
//! assert_eq!(host.output(), b"x");
//! ```

pub mod assembler;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod frame;
pub mod host;
pub mod label;
pub mod memory;
pub mod port;
pub mod rng;
pub mod vm;
pub mod word;
