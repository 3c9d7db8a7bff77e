//! These models represent the objects passed through the bridge
//!
//! There are several different related formats we need to interact with:
//! - vercel useChat messages/tools, sent from the interface to the bridge
//! - vercel streaming protocol frames, sent from the bridge to the interface
//! - cortex messages/tool specs, sent from the bridge to the inference API
//!
//! These overlap to varying degrees. Inbound client shapes are duck-typed
//! (several callers populate different fields for the same concept), so the
//! client-side types keep their payloads as raw JSON and expose accessors,
//! while the cortex-side types are strict because we own what we send.
pub mod content;
pub mod message;
pub mod tool;
