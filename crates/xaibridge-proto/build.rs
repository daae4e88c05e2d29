fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/grpc_predict_v2.proto");

    tonic_prost_build::configure().compile_protos(&["src/grpc_predict_v2.proto"], &["src"])?;
    Ok(())
}
