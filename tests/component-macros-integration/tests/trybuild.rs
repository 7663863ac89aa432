//! trybuild UI tests for component_macros

#[test]
fn interceptable_contracts_compile() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/interceptable_ok.rs");
    t.pass("tests/trybuild/interceptable_unit_ok.rs");
}
