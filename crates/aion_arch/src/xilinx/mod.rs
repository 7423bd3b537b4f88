//! Xilinx (AMD) device models.
//!
//! Only the I/O column of Series-7 parts is modelled: IOB sites with their
//! pads and buffers, the I/O interface logic next to them, and the per-bank
//! clock-region control site.

pub mod series7;
