// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vision / logic fusion for floor plan pages
//!
//! [`FusionAssembler`] joins the three per-page signal streams into room
//! records: segmentation masks become polygons, OCR text is classified and
//! matched into rooms as labels, and fused detections are matched into rooms
//! as contained objects. A page either assembles completely or fails as one
//! unit; there is no partial-room output.

pub mod assembler;
pub mod ocr;
pub mod text;

pub use assembler::{FusionAssembler, FusionError, PageAssembly};
pub use ocr::{Ocr, OcrError};
pub use text::{TextClassifier, TextKind, VocabClassifier};
