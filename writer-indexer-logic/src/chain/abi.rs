use alloy::sol;

sol! {
    interface IWriterFactory {
        #[derive(Debug)]
        event WriterCreated(
            address indexed writerAddress,
            address indexed storeAddress,
            address indexed admin,
            string title,
            address[] managers
        );
    }

    interface IWriterStorage {
        #[derive(Debug, PartialEq, Eq)]
        struct Entry {
            uint256 createdAtBlock;
            uint256 updatedAtBlock;
            bool exists;
            address author;
            string content;
        }

        #[derive(Debug)]
        event EntryCreated(uint256 indexed id, address indexed author);

        #[derive(Debug)]
        event EntryUpdated(uint256 indexed id, address indexed author);

        #[derive(Debug)]
        event EntryRemoved(uint256 indexed id, address indexed author);

        function getEntry(uint256 id) external view returns (Entry memory);
    }
}
