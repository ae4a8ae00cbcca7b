fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Ensure a protoc binary is available even when one is not installed
    // system-wide by falling back to the vendored binary.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", path);
        }
    }
    tonic_build::compile_protos("proto/modelyard.proto")?;
    Ok(())
}
