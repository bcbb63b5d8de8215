//! Core entry point for the payslip crate.
//!
//! A [`model::PayslipRecord`] is built from named fields, laid out by [`layout`], painted into a
//! single-page PDF by [`builder::DocumentBuilder`], and exported or mailed in bulk by
//! [`batch::BatchDriver`].

pub mod assets;
pub mod batch;
pub mod builder;
pub mod config;
pub mod currency;
pub mod elements;
pub mod fields;
pub mod fonts;
pub mod layout;
pub mod mail;
pub mod model;
pub mod roster;
