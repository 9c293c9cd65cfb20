use super::*;

#[test]
fn write_read_round_trips() {
    let path = "test_round_trip.mex";

    let data = vec![34, 1, 231, 60, 4, 2, 255];
    let text = vec![0x0000_0020, 0x8C22_0004, 0x0000_0008];

    let program_orig = Program::new(data, text, 0x0040_0000);

    write_file(path, &program_orig).unwrap();
    let program_read = read_file(path).unwrap();

    assert_eq!(program_orig, program_read);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn reading_a_non_mex_file_reports_bad_magic() {
    let path = "test_bad_magic.mex";
    std::fs::write(path, b"not a mex file at all").unwrap();
    let err = read_file(path).unwrap_err();
    assert!(matches!(err, MexError::BadMagic(_)));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn empty_text_and_data_round_trip() {
    let path = "test_empty.mex";
    let program_orig = Program::new(vec![], vec![], 0x0040_0000);
    write_file(path, &program_orig).unwrap();
    let program_read = read_file(path).unwrap();
    assert_eq!(program_orig, program_read);
    std::fs::remove_file(path).unwrap();
}
