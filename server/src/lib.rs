// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod hand_control;
pub mod nexstar;
pub mod stellarium_server;
