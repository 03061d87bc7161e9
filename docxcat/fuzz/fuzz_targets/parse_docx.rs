#![no_main]

use docxcat::convert::HtmlConverter;
use docxcat::merge::DocumentBody;
use docxcat::package::DocxPackage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must be rejected with an error, never a panic.
    let Ok(package) = DocxPackage::from_bytes(data) else {
        return;
    };
    let Ok(part) = package.main_document_part() else {
        return;
    };
    if let Ok(text) = package.part_text(&part) {
        let _ = DocumentBody::parse(&part, text);
    }
    let _ = HtmlConverter::new().convert_package(&package);
});
