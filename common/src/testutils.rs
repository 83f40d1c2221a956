use std::path::Path;

/// Create `path` with an apparent size of `size` bytes (sparse where the filesystem allows it)
pub fn write_sized(path: &Path, size: u64) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    file.set_len(size)?;
    Ok(())
}

pub fn setup_test_dir() -> anyhow::Result<tempfile::TempDir> {
    // create a temporary directory
    let tmp_dir = tempfile::tempdir()?;
    // foo
    // |- 0.txt
    // |- bar
    //    |- 1.txt
    //    |- 2.txt
    //    |- 3.txt
    // |- baz
    //    |- 4.txt
    //    |- 5.txt -> ../bar/2.txt
    //    |- 6.txt -> (absolute path) .../foo/bar/3.txt
    let foo_path = tmp_dir.path().join("foo");
    std::fs::create_dir(&foo_path)?;
    std::fs::write(foo_path.join("0.txt"), "0")?;
    let bar_path = foo_path.join("bar");
    std::fs::create_dir(&bar_path)?;
    std::fs::write(bar_path.join("1.txt"), "1")?;
    std::fs::write(bar_path.join("2.txt"), "2")?;
    std::fs::write(bar_path.join("3.txt"), "3")?;
    let baz_path = foo_path.join("baz");
    std::fs::create_dir(&baz_path)?;
    std::fs::write(baz_path.join("4.txt"), "4")?;
    std::os::unix::fs::symlink("../bar/2.txt", baz_path.join("5.txt"))?;
    std::os::unix::fs::symlink(bar_path.join("3.txt"), baz_path.join("6.txt"))?;
    Ok(tmp_dir)
}
