fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .btree_map(["."])
        .compile_protos(&["proto/gnmi.proto"], &["proto"])
        .unwrap_or_else(|e| panic!("protobuf compile error: {}", e));

    println!("cargo:rerun-if-changed=proto/gnmi.proto");
    Ok(())
}
