use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use burn::data::{
    dataset::{
        transform::{Mapper, MapperDataset},
        Dataset, InMemDataset,
    },
    network::downloader,
};
use clap::ValueEnum;
use flate2::read::GzDecoder;
use globwalk::DirEntry;
use tar::Archive;

use crate::{
    data::{load_rgb, ImageItem},
    error::{Error, Result},
};

const SUPPORTED_FILES: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

const CIFAR10_URL: &str = "https://s3.amazonaws.com/fast-ai-sample/cifar10.tgz";

/// CIFAR-10 class names in label order.
pub const CIFAR10_CLASSES: [&str; 10] = [
    "plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck",
];

/// Folder names of the extracted CIFAR-10 archive, matching `CIFAR10_CLASSES`.
const CIFAR10_FOLDERS: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Image path and class index, before decoding.
#[derive(Debug, Clone)]
struct ImageItemRaw {
    image_path: PathBuf,
    label: usize,
}

/// Decodes the image of a raw item.
struct PathToImageItem;

impl Mapper<ImageItemRaw, ImageItem> for PathToImageItem {
    fn map(&self, item: &ImageItemRaw) -> ImageItem {
        // The walk only keeps supported extensions, a failure here is a corrupt file.
        let pixels = load_rgb(&item.image_path).unwrap_or_else(|err| panic!("{err}"));

        ImageItem {
            pixels,
            label: item.label,
        }
    }
}

type ImageFolderMapper = MapperDataset<InMemDataset<ImageItemRaw>, PathToImageItem, ImageItemRaw>;

/// Classification dataset laid out as `root/<class>/<image>`.
///
/// Images are decoded lazily when an item is fetched.
pub struct ImageFolder {
    dataset: ImageFolderMapper,
    classes: Vec<String>,
}

impl Dataset<ImageItem> for ImageFolder {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl ImageFolder {
    /// Creates a dataset whose classes are the sorted names of the folders holding images.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let images = walk(root)?;

        let classes = images
            .iter()
            .map(|(_, class)| class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        Self::with_items(root, images, classes)
    }

    /// Creates a dataset labelled with the given classes.
    ///
    /// Every image folder must be one of `classes`; classes without images are allowed.
    pub fn with_classes<P: AsRef<Path>, S: AsRef<str>>(root: P, classes: &[S]) -> Result<Self> {
        let root = root.as_ref();
        let images = walk(root)?;
        let classes = classes.iter().map(|c| c.as_ref().to_string()).collect();

        Self::with_items(root, images, classes)
    }

    /// Class names, indexed by label.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn with_items(root: &Path, images: Vec<(PathBuf, String)>, classes: Vec<String>) -> Result<Self> {
        if images.is_empty() {
            return Err(Error::NoImages {
                root: root.to_path_buf(),
            });
        }

        let items = images
            .into_iter()
            .map(|(image_path, class)| {
                let label = classes
                    .iter()
                    .position(|c| *c == class)
                    .ok_or_else(|| Error::UnknownClass {
                        class,
                        root: root.to_path_buf(),
                    })?;

                Ok(ImageItemRaw { image_path, label })
            })
            .collect::<Result<Vec<_>>>()?;

        let dataset = MapperDataset::new(InMemDataset::new(items), PathToImageItem);

        Ok(Self { dataset, classes })
    }
}

/// Supported image files under `root`, in path order, paired with their class folder name.
fn walk(root: &Path) -> Result<Vec<(PathBuf, String)>> {
    if !root.is_dir() {
        return Err(Error::NoImages {
            root: root.to_path_buf(),
        });
    }

    let walker = globwalk::GlobWalkerBuilder::from_patterns(
        root,
        &[format!("*.{{{}}}", SUPPORTED_FILES.join(","))], // "*.{ext1,ext2,ext3}"
    )
    .case_insensitive(true)
    .follow_links(true)
    .sort_by(|p1: &DirEntry, p2: &DirEntry| p1.path().cmp(p2.path()))
    .build()?
    .filter_map(std::result::Result::ok);

    let images = walker
        .filter_map(|entry| {
            let path = entry.into_path();
            let class = class_of(root, &path)?;
            Some((path, class))
        })
        .collect();

    Ok(images)
}

/// Name of the folder directly under `root` that holds `path`, at any depth.
///
/// Files sitting in `root` itself belong to no class.
fn class_of(root: &Path, path: &Path) -> Option<String> {
    let mut components = path.strip_prefix(root).ok()?.components();
    let class = components.next()?;
    components.next()?;

    Some(class.as_os_str().to_string_lossy().into_owned())
}

/// Train and test splits sharing one class list.
pub struct DatasetSplits {
    pub train: ImageFolder,
    pub test: ImageFolder,
    pub classes: Vec<String>,
}

impl DatasetSplits {
    /// Opens `root/train` and `root/test`, labelling the test split with the training classes.
    pub fn from_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let train = ImageFolder::new(root.join("train"))?;

        Self::with_train(root, train)
    }

    /// Opens `root/train` and `root/test`, labelling both splits with the given class folders.
    pub fn with_classes<P: AsRef<Path>, S: AsRef<str>>(root: P, classes: &[S]) -> Result<Self> {
        let root = root.as_ref();
        let train = ImageFolder::with_classes(root.join("train"), classes)?;

        Self::with_train(root, train)
    }

    fn with_train(root: &Path, train: ImageFolder) -> Result<Self> {
        let classes = train.classes().to_vec();
        let test = ImageFolder::with_classes(root.join("test"), &classes)?;

        log::info!(
            "Loaded {} training and {} test images over {} classes from {}",
            train.len(),
            test.len(),
            classes.len(),
            root.display()
        );

        Ok(Self {
            train,
            test,
            classes,
        })
    }
}

/// Where the training images come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    /// CIFAR-10, downloaded on first use.
    #[default]
    Cifar10,
    /// `custom/train/<class>/...` and `custom/test/<class>/...` under the data directory.
    Custom,
}

impl DatasetKind {
    /// Resolves the source into its train and test splits.
    pub fn load<P: AsRef<Path>>(self, data_dir: P) -> Result<DatasetSplits> {
        let data_dir = data_dir.as_ref();

        match self {
            DatasetKind::Cifar10 => {
                let root = download_cifar10(data_dir)?;
                let mut splits = DatasetSplits::with_classes(root, &CIFAR10_FOLDERS)?;
                splits.classes = CIFAR10_CLASSES.iter().map(|c| c.to_string()).collect();
                Ok(splits)
            }
            DatasetKind::Custom => {
                let splits = DatasetSplits::from_root(data_dir.join("custom"))?;
                if splits.classes.len() != CIFAR10_CLASSES.len() {
                    log::warn!(
                        "Custom dataset has {} classes, the output layer is sized to match",
                        splits.classes.len()
                    );
                }
                Ok(splits)
            }
        }
    }
}

/// Downloads and unpacks the CIFAR-10 image folders unless they are already present.
fn download_cifar10(data_dir: &Path) -> Result<PathBuf> {
    let cifar_dir = data_dir.join("cifar10");
    let labels_file = cifar_dir.join("labels.txt");

    if !labels_file.exists() {
        std::fs::create_dir_all(data_dir)?;
        let bytes = downloader::download_file_as_bytes(CIFAR10_URL, "cifar10.tgz");

        let gz_buffer = GzDecoder::new(&bytes[..]);
        let mut archive = Archive::new(gz_buffer);
        archive.unpack(data_dir)?;
        log::info!("CIFAR-10 extracted to {}", cifar_dir.display());
    }

    Ok(cifar_dir)
}
