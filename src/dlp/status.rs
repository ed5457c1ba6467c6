// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DLP response status codes.
//!
//! These are the values the device places in a response's 2-byte errno
//! field. `NoErr` means the call's arguments should be parsed; anything
//! else means the argument list is empty and only the status matters.

/// The stable DLP status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlpStatus {
    NoErr,
    GeneralSystem,
    IllegalReq,
    NotEnoughMemory,
    NotFound,
    NoneOpen,
    AlreadyOpen,
    TooManyOpenDatabases,
    CantOpen,
    AlreadyExists,
    CantOpenOwner,
    CantRead,
    NotOpen,
    RecordBusy,
    NotSupported,
    UnusedErrCode,
    ReadOnly,
    NotEnoughSpace,
    LimitExceeded,
    SyncCancelled,
    BadWrapper,
    ArgMissing,
    BadArgumentSize,
    /// A code the device sent that we don't have a name for.
    Unknown(u16),
}

impl DlpStatus {
    #[must_use]
    pub fn from_wire(code: u16) -> Self {
        match code {
            0 => DlpStatus::NoErr,
            1 => DlpStatus::GeneralSystem,
            2 => DlpStatus::IllegalReq,
            3 => DlpStatus::NotEnoughMemory,
            4 => DlpStatus::NotFound,
            5 => DlpStatus::NoneOpen,
            6 => DlpStatus::AlreadyOpen,
            7 => DlpStatus::TooManyOpenDatabases,
            8 => DlpStatus::CantOpen,
            9 => DlpStatus::AlreadyExists,
            10 => DlpStatus::CantOpenOwner,
            11 => DlpStatus::CantRead,
            12 => DlpStatus::NotOpen,
            13 => DlpStatus::RecordBusy,
            14 => DlpStatus::NotSupported,
            15 => DlpStatus::UnusedErrCode,
            16 => DlpStatus::ReadOnly,
            17 => DlpStatus::NotEnoughSpace,
            18 => DlpStatus::LimitExceeded,
            19 => DlpStatus::SyncCancelled,
            20 => DlpStatus::BadWrapper,
            21 => DlpStatus::ArgMissing,
            22 => DlpStatus::BadArgumentSize,
            other => DlpStatus::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_wire(self) -> u16 {
        match self {
            DlpStatus::NoErr => 0,
            DlpStatus::GeneralSystem => 1,
            DlpStatus::IllegalReq => 2,
            DlpStatus::NotEnoughMemory => 3,
            DlpStatus::NotFound => 4,
            DlpStatus::NoneOpen => 5,
            DlpStatus::AlreadyOpen => 6,
            DlpStatus::TooManyOpenDatabases => 7,
            DlpStatus::CantOpen => 8,
            DlpStatus::AlreadyExists => 9,
            DlpStatus::CantOpenOwner => 10,
            DlpStatus::CantRead => 11,
            DlpStatus::NotOpen => 12,
            DlpStatus::RecordBusy => 13,
            DlpStatus::NotSupported => 14,
            DlpStatus::UnusedErrCode => 15,
            DlpStatus::ReadOnly => 16,
            DlpStatus::NotEnoughSpace => 17,
            DlpStatus::LimitExceeded => 18,
            DlpStatus::SyncCancelled => 19,
            DlpStatus::BadWrapper => 20,
            DlpStatus::ArgMissing => 21,
            DlpStatus::BadArgumentSize => 22,
            DlpStatus::Unknown(code) => code,
        }
    }

    /// A one-line English description, used in the sync engine's per-database
    /// log line.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            DlpStatus::NoErr => "no error",
            DlpStatus::GeneralSystem => "general system error",
            DlpStatus::IllegalReq => "unsupported request on this device",
            DlpStatus::NotEnoughMemory => "out of memory on device",
            DlpStatus::NotFound => "not found",
            DlpStatus::NoneOpen => "no database open",
            DlpStatus::AlreadyOpen => "database already open",
            DlpStatus::TooManyOpenDatabases => "too many open databases",
            DlpStatus::CantOpen => "can't open database",
            DlpStatus::AlreadyExists => "database already exists",
            DlpStatus::CantOpenOwner => "can't open, owned by another app",
            DlpStatus::CantRead => "can't read database",
            DlpStatus::NotOpen => "database not open",
            DlpStatus::RecordBusy => "record busy",
            DlpStatus::NotSupported => "not supported",
            DlpStatus::UnusedErrCode => "unused error code",
            DlpStatus::ReadOnly => "database is read-only",
            DlpStatus::NotEnoughSpace => "not enough space on device",
            DlpStatus::LimitExceeded => "size limit exceeded",
            DlpStatus::SyncCancelled => "sync cancelled",
            DlpStatus::BadWrapper => "malformed request wrapper",
            DlpStatus::ArgMissing => "required argument missing",
            DlpStatus::BadArgumentSize => "argument size malformed",
            DlpStatus::Unknown(_) => "unrecognized device status",
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, DlpStatus::NoErr)
    }
}

impl std::fmt::Display for DlpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
