// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod angle_codec;
pub mod bridge_error;
pub mod mount_trait;
pub mod stellarium_frame;
