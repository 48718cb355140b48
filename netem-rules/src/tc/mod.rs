//! # Traffic Control Commands
//!
//! This module builds the `tc`, `ip` and `modprobe` argument vectors needed to impair traffic
//! towards (or from) selected address ranges. Nothing here runs a command: every request has a
//! `build` method returning a [`Cmd`](crate::command::Cmd) for an
//! [`Executor`](crate::command::Executor) to carry out.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        HTB Root Qdisc (1:)                                  │
//! │                                                                             │
//! │   Hierarchical Token Bucket is the root classifier. u32 filters attached    │
//! │   to it send packets whose address matches a rule into that rule's class.   │
//! │   Unmatched traffic is sent unshaped.                                       │
//! └─────────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//!                         ┌──────────────────┐
//!                         │  Class 1:1       │
//!                         │  rate = ceiling  │
//!                         └──────────────────┘
//!                                    │
//!            ┌───────────────────────┼───────────────────────┐
//!            │                       │                       │
//!            ▼                       ▼                       ▼
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │  Class 1:10      │    │  Class 1:11      │    │  Class 1:12      │
//! │  rate = ceiling  │    │  rate = ceiling  │    │  rate = ceiling  │
//! └──────────────────┘    └──────────────────┘    └──────────────────┘
//!            │                       │                       │
//!            ▼                       ▼                       ▼
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │  Netem           │    │  Netem           │    │  Netem           │
//! │  rule 0 args     │    │  rule 1 args     │    │  rule 2 args     │
//! └──────────────────┘    └──────────────────┘    └──────────────────┘
//! ```
//!
//! ## Handle Numbering Scheme
//!
//! | Component        | Handle          |
//! |------------------|-----------------|
//! | HTB root qdisc   | `1:`            |
//! | Ceiling class    | `1:1`           |
//! | Rule class       | `1:(10+n)`      |
//! | Ingress qdisc    | `ffff:`         |
//!
//! ## Inbound Traffic
//!
//! Linux can only shape traffic leaving a device. To impair what a device receives, an
//! `ingress` qdisc is installed on it with a catch-all u32 filter whose `mirred` action
//! redirects every packet to the egress path of an IFB (Intermediate Functional Block) device.
//! The HTB tree is then built on the IFB device, matching on the source address.
//!
//! ```text
//! eth0 ingress (ffff:) -> u32 match-all -> mirred redirect -> ifb0 egress -> HTB (1:) -> netem
//! ```

pub mod filter;
pub mod handle;
pub mod htb;
pub mod ifb;
pub mod netem;
pub mod qdisc;
