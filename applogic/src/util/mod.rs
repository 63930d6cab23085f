// SPDX-FileCopyrightText: 2024 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

mod cubit_core;
mod debounce;
mod spawn;

pub(crate) use cubit_core::{Cubit, CubitCore};
pub(crate) use debounce::Debouncer;
pub(crate) use spawn::spawn_from_sync;
