// Rebuild when the GDAL location changes; the gdal-sys probe reads these

fn main() {
    for var in ["GDAL_HOME", "GDAL_DATA", "GDAL_STATIC"] {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    if std::env::var("GDAL_HOME").is_err() {
        println!("cargo:warning=GDAL_HOME not set; locating GDAL through pkg-config");
    }
}
