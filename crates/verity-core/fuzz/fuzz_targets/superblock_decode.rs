#![no_main]
use libfuzzer_sys::fuzz_target;
use verity_core::Superblock;

fuzz_target!(|data: &[u8]| {
    if let Ok(sb) = Superblock::decode(data) {
        // Anything we accept must re-encode to the same header bytes.
        let again = Superblock::decode(&sb.encode()).expect("re-decode");
        assert_eq!(sb, again);
    }
});
