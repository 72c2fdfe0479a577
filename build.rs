fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds don't depend on a system install
    let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
    std::env::set_var("PROTOC", protoc);

    tonic_build::compile_protos("proto/forage.proto")?;
    println!("cargo:rerun-if-changed=proto/forage.proto");
    Ok(())
}
