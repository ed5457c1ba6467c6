#![no_main]

use coldsync_core::pdb::pdb_read;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = pdb_read(data);
});
